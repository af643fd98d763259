//! Repository descriptor sources (search backends)

use crate::domain::RepositoryDescriptor;
use crate::error::SourceError;
use std::collections::HashSet;

pub mod github;

pub use github::GithubSearch;

/// Supplies the ranked list of repositories a run will clone.
pub trait DescriptorSource {
    fn fetch(
        &self,
        query: &str,
        count: usize,
        credential: Option<&str>,
    ) -> Result<Vec<RepositoryDescriptor>, SourceError>;
}

/// Drop repeated identifiers, order by stars (descending, stable) and cap at `count`.
///
/// The first occurrence of an identifier wins, so a repository keeps the rank
/// the search API gave it first.
pub fn rank_and_dedupe(
    descriptors: Vec<RepositoryDescriptor>,
    count: usize,
) -> Vec<RepositoryDescriptor> {
    let mut seen = HashSet::new();
    let mut unique: Vec<RepositoryDescriptor> = descriptors
        .into_iter()
        .filter(|d| {
            let fresh = seen.insert(d.identifier.to_ascii_lowercase());
            if !fresh {
                tracing::debug!("Dropping duplicate search result {}", d.identifier);
            }
            fresh
        })
        .collect();
    unique.sort_by(|a, b| b.stars.cmp(&a.stars));
    unique.truncate(count);
    unique
}

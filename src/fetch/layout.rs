//! Per-repository directory naming

use crate::domain::RepositoryDescriptor;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\-]").unwrap());

/// Replace anything outside `[A-Za-z0-9_-]` with `_`.
pub fn clean_dir_name(text: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(text.trim(), "_").into_owned();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// One directory name per descriptor, in input order.
///
/// Names are compared case-insensitively. A name already taken gets the
/// descriptor's input index appended (`owner_repo_3`).
pub fn assign_dir_names(descriptors: &[RepositoryDescriptor]) -> Vec<String> {
    let mut taken = HashSet::new();
    let mut names = Vec::with_capacity(descriptors.len());

    for (index, descriptor) in descriptors.iter().enumerate() {
        let base = clean_dir_name(&descriptor.identifier);
        let mut name = base.clone();
        let mut bump = 0usize;
        while !taken.insert(name.to_ascii_lowercase()) {
            name = if bump == 0 {
                format!("{base}_{index}")
            } else {
                format!("{base}_{index}_{bump}")
            };
            bump += 1;
        }
        names.push(name);
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(id: &str) -> RepositoryDescriptor {
        RepositoryDescriptor::new(id, format!("https://github.com/{id}.git"), 0)
    }

    #[test]
    fn cleans_identifiers() {
        assert_eq!(clean_dir_name("rust-lang/rust"), "rust-lang_rust");
        assert_eq!(clean_dir_name("a.b/c d"), "a_b_c_d");
        assert_eq!(clean_dir_name(""), "_");
    }

    #[test]
    fn colliding_names_get_index_suffix() {
        let names = assign_dir_names(&[repo("a/b.c"), repo("a/b_c"), repo("x/y"), repo("A/B-C")]);
        assert_eq!(names, vec!["a_b_c", "a_b_c_1", "x_y", "A_B-C"]);
    }

    #[test]
    fn case_insensitive_collision() {
        let names = assign_dir_names(&[repo("Owner/Repo"), repo("owner/repo")]);
        assert_eq!(names, vec!["Owner_Repo", "owner_repo_1"]);
    }

    #[test]
    fn suffix_that_is_itself_taken_is_bumped() {
        let names = assign_dir_names(&[repo("a/b"), repo("a/b_2"), repo("a.b")]);
        assert_eq!(names, vec!["a_b", "a_b_2", "a_b_2_1"]);
    }
}

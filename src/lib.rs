//! repo-harvest: search GitHub, clone the top matches, and bundle them
//!
//! A run asks a [`source::DescriptorSource`] for the most popular
//! repositories matching a query, clones them through a bounded
//! [`fetch::ClonePool`], strips `.git` from each clone, and packages the
//! results with a text report into one timestamped `.tar.gz`.

pub mod archive;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod render;
pub mod sanitize;
pub mod source;

pub use archive::{archive, ArchiveOutput};
pub use domain::{CloneOutcome, CloneStatus, RepositoryDescriptor, RunContext};
pub use error::{ArchiveError, CloneError, HarvestError, SourceError};
pub use fetch::{clone_all, CancelFlag, CloneOperation, ClonePool, CloneRequest};
pub use pipeline::{Pipeline, PipelineOptions, RunSummary};
pub use render::{build_report, RunReport};
pub use sanitize::{sanitize, SanitizeResult};

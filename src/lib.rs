//! Reconciles a declared GitHub issue against the GitHub Issues REST API.
//!
//! [`IssueController`] exposes the lifecycle verbs (create, read, update,
//! delete-by-locking) over a typed [`IssueResource`] record; the record can
//! also be adopted from an `OWNER/REPOSITORY/NUMBER` key with
//! [`IssueResource::import`].

pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod logging;
pub mod plan;
pub mod resource;

pub mod github {
    pub mod client;
    pub mod issues;
    pub mod mapping;
    pub mod memory;
    pub(crate) mod transport;

    pub use client::{Fetched, GitHubClient, IssuesApi};
    pub use mapping::{labels_to_names, users_to_names};
    pub use memory::InMemoryIssues;
}

pub use config::ClientSettings;
pub use context::{CancellationToken, RequestContext};
pub use controller::{IssueController, ReadOutcome};
pub use error::{ApiError, ImportError, ResourceError, ValidationError};
pub use github::issues::IssueState;
pub use plan::{ResourceAction, plan_change};
pub use resource::{IssueConfig, IssueResource};

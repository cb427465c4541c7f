use serde::{Deserialize, Serialize};

use crate::error::{ImportError, ValidationError};
use crate::github::issues::IssueState;

pub const DEFAULT_LOCK_REASON: &str = "Controlled by Terraform";

fn default_lock_reason() -> String {
    DEFAULT_LOCK_REASON.to_string()
}

/// Desired state of one issue, as declared by the caller.
///
/// Computed fields (`etag`, `number`, `issue_id`) are deliberately absent:
/// a document that sets them is rejected by `deny_unknown_fields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueConfig {
    pub owner: String,
    pub repository: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub milestone_number: u64,
    #[serde(default = "default_lock_reason")]
    pub lock_reason: String,
}

impl IssueConfig {
    pub fn new(
        owner: impl Into<String>,
        repository: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repository: repository.into(),
            title: title.into(),
            body: body.into(),
            state: IssueState::Open,
            labels: Vec::new(),
            assignees: Vec::new(),
            milestone_number: 0,
            lock_reason: default_lock_reason(),
        }
    }

    /// Parses and validates a desired-state document.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ConfigDocumentError> {
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_fields(&self.owner, &self.repository, Some(&self.title))
    }
}

/// Why a desired-state document was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ConfigDocumentError {
    #[error("malformed issue document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Locally persisted state of one tracked issue.
///
/// `id` is the local identifier: the remote node id once known, the
/// `owner/repository/number` key right after an import, and empty once the
/// issue has been observed gone.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IssueResource {
    #[serde(default)]
    pub id: String,
    pub owner: String,
    pub repository: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub milestone_number: u64,
    #[serde(default = "default_lock_reason")]
    pub lock_reason: String,
    #[serde(default)]
    pub etag: String,
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub issue_id: u64,
}

impl IssueResource {
    /// A not-yet-created record carrying the desired fields.
    pub fn planned(config: &IssueConfig) -> Self {
        let mut resource = Self {
            owner: config.owner.clone(),
            repository: config.repository.clone(),
            ..Self::default()
        };
        resource.apply(config);
        resource
    }

    /// Reconstructs identity from an `OWNER/REPOSITORY/NUMBER` key without
    /// contacting the remote.
    pub fn import(key: &str) -> Result<Self, ImportError> {
        let parts: Vec<&str> = key.split('/').collect();
        if parts.len() != 3 || parts.iter().any(|part| part.is_empty()) {
            return Err(ImportError::Format(key.to_string()));
        }
        let number = parts[2]
            .parse::<u64>()
            .map_err(|source| ImportError::Number {
                segment: parts[2].to_string(),
                source,
            })?;

        Ok(Self {
            id: import_key(parts[0], parts[1], number),
            owner: parts[0].to_string(),
            repository: parts[1].to_string(),
            number,
            lock_reason: default_lock_reason(),
            ..Self::default()
        })
    }

    /// Copies the mutable desired fields onto the record.
    ///
    /// Identity (`owner`, `repository`, `id`) and computed fields are left
    /// alone; changing owner or repository requires replacement, see
    /// [`crate::plan::plan_change`].
    pub fn apply(&mut self, config: &IssueConfig) {
        self.title = config.title.clone();
        self.body = config.body.clone();
        self.state = config.state;
        self.labels = config.labels.clone();
        self.assignees = config.assignees.clone();
        self.milestone_number = config.milestone_number;
        self.lock_reason = config.lock_reason.clone();
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_fields(&self.owner, &self.repository, Some(&self.title))
    }

    /// Checks only the fields that address the remote issue.
    pub fn validate_identity(&self) -> Result<(), ValidationError> {
        require_fields(&self.owner, &self.repository, None)
    }

    /// `owner/repository/number`, the human-readable key of the issue.
    pub fn key(&self) -> String {
        import_key(&self.owner, &self.repository, self.number)
    }

    /// True once a Read has observed the issue gone.
    pub fn is_gone(&self) -> bool {
        self.id.is_empty()
    }

    /// True while the identifier is still this record's own composite
    /// import key rather than a remote node id.
    pub fn has_import_key(&self) -> bool {
        self.id == self.key()
    }
}

fn require_fields(
    owner: &str,
    repository: &str,
    title: Option<&str>,
) -> Result<(), ValidationError> {
    require_present("owner", owner)?;
    require_present("repository", repository)?;
    match title {
        Some(title) => require_present("title", title),
        None => Ok(()),
    }
}

fn require_present(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank { field });
    }
    Ok(())
}

fn import_key(owner: &str, repository: &str, number: u64) -> String {
    format!("{owner}/{repository}/{number}")
}

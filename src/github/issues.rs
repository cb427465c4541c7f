use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Issue as returned by `GET /repos/{owner}/{repo}/issues/{number}`.
///
/// Only the fields the controller mirrors are modelled; everything else in
/// the payload is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubIssue {
    pub id: u64,
    pub node_id: String,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
    #[serde(default)]
    pub assignees: Vec<GitHubUser>,
    #[serde(default)]
    pub milestone: Option<GitHubMilestone>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub active_lock_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubUser {
    #[serde(default)]
    pub login: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubLabel {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubMilestone {
    pub number: u64,
    #[serde(default)]
    pub title: Option<String>,
}

/// Open/closed state of an issue.
///
/// Serialized lowercase; parsed case-insensitively so `"Closed"` in a
/// desired-state document is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
}

impl IssueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        }
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("open") {
            Ok(IssueState::Open)
        } else if s.eq_ignore_ascii_case("closed") {
            Ok(IssueState::Closed)
        } else {
            Err(ValidationError::UnknownState(s.to_string()))
        }
    }
}

impl TryFrom<String> for IssueState {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Body of the create (`POST`) and edit (`PATCH`) issue calls.
///
/// `milestone` is always serialized: `null` is GitHub's "no milestone"
/// value, which clears the milestone on edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueRequest {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<IssueState>,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub milestone: Option<u64>,
}

/// Maps the local `milestone_number` convention (0 = none) onto the API's.
pub fn milestone_from_number(number: u64) -> Option<u64> {
    (number != 0).then_some(number)
}

/// Body of `PUT /repos/{owner}/{repo}/issues/{number}/lock`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LockIssueOptions {
    pub lock_reason: String,
}

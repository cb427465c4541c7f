//! In-memory [`IssuesApi`] backend.
//!
//! Behaves like the GitHub Issues endpoints the controller uses: numbers are
//! allocated per repository, every mutation bumps the issue's ETag, missing
//! issues answer [`ApiError::NotFound`], and locking never removes anything.
//! Intended for tests and dry runs of embedding tools.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::github::client::{Fetched, IssuesApi};
use crate::github::issues::{
    GitHubIssue, GitHubLabel, GitHubMilestone, GitHubUser, IssueRequest, IssueState,
    LockIssueOptions,
};

/// One call observed by [`InMemoryIssues`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: &'static str,
    pub owner: String,
    pub repo: String,
    pub number: Option<u64>,
    /// The conditional token sent with `get issue`, if any.
    pub etag: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredIssue {
    issue: GitHubIssue,
    version: u64,
}

impl StoredIssue {
    fn etag(&self) -> String {
        format!("\"{}-{}\"", self.issue.node_id, self.version)
    }

    fn fetched(&self) -> Fetched<GitHubIssue> {
        Fetched {
            value: self.issue.clone(),
            etag: Some(self.etag()),
        }
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}

#[derive(Default)]
struct Inner {
    issues: HashMap<(String, String, u64), StoredIssue>,
    next_number: HashMap<(String, String), u64>,
    next_id: u64,
    calls: Vec<RecordedCall>,
    failures: VecDeque<ApiError>,
    latency: Option<Duration>,
}

#[derive(Default)]
pub struct InMemoryIssues {
    inner: Mutex<Inner>,
}

impl InMemoryIssues {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Queues an error to be returned by the next call instead of its normal answer.
    pub fn fail_next(&self, error: ApiError) {
        self.lock().failures.push_back(error);
    }

    /// Delays every subsequent call by `latency` before it touches any state.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.lock().latency = latency;
    }

    /// Current remote copy of an issue.
    pub fn issue(&self, owner: &str, repo: &str, number: u64) -> Option<GitHubIssue> {
        self.lock()
            .issues
            .get(&(owner.to_string(), repo.to_string(), number))
            .map(|stored| stored.issue.clone())
    }

    /// Drops an issue as if it had been deleted or transferred out of band.
    pub fn remove(&self, owner: &str, repo: &str, number: u64) -> Option<GitHubIssue> {
        self.lock()
            .issues
            .remove(&(owner.to_string(), repo.to_string(), number))
            .map(|stored| stored.issue)
    }

    /// Applies an out-of-band edit, bumping the issue's ETag.
    pub fn modify<F>(&self, owner: &str, repo: &str, number: u64, edit: F) -> bool
    where
        F: FnOnce(&mut GitHubIssue),
    {
        let mut inner = self.lock();
        match inner
            .issues
            .get_mut(&(owner.to_string(), repo.to_string(), number))
        {
            Some(stored) => {
                edit(&mut stored.issue);
                stored.bump();
                true
            }
            None => false,
        }
    }

    async fn begin(
        &self,
        operation: &'static str,
        owner: &str,
        repo: &str,
        number: Option<u64>,
        etag: Option<&str>,
    ) -> Result<(), ApiError> {
        let latency = {
            let mut inner = self.lock();
            inner.calls.push(RecordedCall {
                operation,
                owner: owner.to_string(),
                repo: repo.to_string(),
                number,
                etag: etag.map(str::to_string),
            });
            inner.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match self.lock().failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn not_found(operation: &str) -> ApiError {
    ApiError::NotFound {
        operation: operation.to_string(),
    }
}

fn apply_request(issue: &mut GitHubIssue, request: &IssueRequest) {
    issue.title = request.title.clone();
    issue.body = Some(request.body.clone());
    if let Some(state) = request.state {
        issue.state = state;
    }
    issue.labels = request
        .labels
        .iter()
        .map(|name| GitHubLabel {
            name: Some(name.clone()),
        })
        .collect();
    issue.assignees = request
        .assignees
        .iter()
        .map(|login| GitHubUser {
            login: Some(login.clone()),
        })
        .collect();
    issue.milestone = request.milestone.map(|number| GitHubMilestone {
        number,
        title: None,
    });
}

#[async_trait]
impl IssuesApi for InMemoryIssues {
    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        request: &IssueRequest,
    ) -> Result<Fetched<GitHubIssue>, ApiError> {
        self.begin("create issue", owner, repo, None, None).await?;

        let mut inner = self.lock();
        let counter = inner
            .next_number
            .entry((owner.to_string(), repo.to_string()))
            .or_insert(0);
        *counter += 1;
        let number = *counter;
        inner.next_id += 1;
        let id = 1000 + inner.next_id;

        let mut issue = GitHubIssue {
            id,
            node_id: format!("I_kwDO{id:06}"),
            number,
            title: String::new(),
            body: None,
            state: IssueState::Open,
            labels: Vec::new(),
            assignees: Vec::new(),
            milestone: None,
            locked: false,
            active_lock_reason: None,
        };
        apply_request(&mut issue, request);
        // New issues always start open whatever the request says.
        issue.state = IssueState::Open;

        let stored = StoredIssue { issue, version: 1 };
        let fetched = stored.fetched();
        inner
            .issues
            .insert((owner.to_string(), repo.to_string(), number), stored);
        Ok(fetched)
    }

    async fn get_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        etag: Option<&str>,
    ) -> Result<Fetched<GitHubIssue>, ApiError> {
        const OPERATION: &str = "get issue";
        self.begin(OPERATION, owner, repo, Some(number), etag)
            .await?;

        let inner = self.lock();
        inner
            .issues
            .get(&(owner.to_string(), repo.to_string(), number))
            .map(StoredIssue::fetched)
            .ok_or_else(|| not_found(OPERATION))
    }

    async fn edit_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        request: &IssueRequest,
    ) -> Result<Fetched<GitHubIssue>, ApiError> {
        const OPERATION: &str = "edit issue";
        self.begin(OPERATION, owner, repo, Some(number), None)
            .await?;

        let mut inner = self.lock();
        let stored = inner
            .issues
            .get_mut(&(owner.to_string(), repo.to_string(), number))
            .ok_or_else(|| not_found(OPERATION))?;
        apply_request(&mut stored.issue, request);
        stored.bump();
        Ok(stored.fetched())
    }

    async fn lock_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        options: &LockIssueOptions,
    ) -> Result<(), ApiError> {
        const OPERATION: &str = "lock issue";
        self.begin(OPERATION, owner, repo, Some(number), None)
            .await?;

        let mut inner = self.lock();
        let stored = inner
            .issues
            .get_mut(&(owner.to_string(), repo.to_string(), number))
            .ok_or_else(|| not_found(OPERATION))?;
        stored.issue.locked = true;
        stored.issue.active_lock_reason = Some(options.lock_reason.clone());
        stored.bump();
        Ok(())
    }
}

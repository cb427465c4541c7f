use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::RequestContext;
use crate::error::{ResourceError, Result};
use crate::github::client::IssuesApi;
use crate::github::issues::{IssueRequest, LockIssueOptions, milestone_from_number};
use crate::github::mapping::{labels_to_names, users_to_names};
use crate::resource::IssueResource;

/// What a Read observed on the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The issue exists and the record now mirrors it.
    Present,
    /// The issue is gone; the record's identifier has been cleared and the
    /// caller should drop it from tracked state.
    Gone,
}

/// Reconciles one [`IssueResource`] at a time against the GitHub Issues API.
///
/// Every verb performs a single primary remote call; Create and Update then
/// chain an unconditional Read so the record reflects the authoritative
/// remote representation.
#[derive(Clone)]
pub struct IssueController {
    client: Arc<dyn IssuesApi>,
}

impl IssueController {
    pub fn new(client: Arc<dyn IssuesApi>) -> Self {
        Self { client }
    }

    /// Creates the issue described by `resource` and binds the record to the
    /// returned node id.
    ///
    /// If the chained Read fails or is cancelled, the record keeps the
    /// identity assigned by the create call and should be refreshed later.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        resource: &mut IssueResource,
    ) -> Result<ReadOutcome> {
        resource.validate()?;
        debug!(
            owner = %resource.owner,
            repository = %resource.repository,
            "creating issue"
        );

        let request = IssueRequest {
            title: resource.title.clone(),
            body: resource.body.clone(),
            state: None,
            labels: resource.labels.clone(),
            assignees: resource.assignees.clone(),
            milestone: milestone_from_number(resource.milestone_number),
        };
        let created = ctx
            .run(
                self.client
                    .create_issue(&resource.owner, &resource.repository, &request),
            )
            .await?
            .value;

        resource.state = created.state;
        resource.issue_id = created.id;
        resource.number = created.number;
        resource.id = created.node_id;
        resource.etag.clear();

        self.read(ctx, resource, None).await
    }

    /// Refreshes an already-tracked record, letting the client skip the
    /// payload when the stored ETag is still current.
    pub async fn refresh(
        &self,
        ctx: &RequestContext,
        resource: &mut IssueResource,
    ) -> Result<ReadOutcome> {
        let etag = resource.etag.clone();
        let conditional = (!etag.is_empty()).then_some(etag.as_str());
        self.read(ctx, resource, conditional).await
    }

    /// Fetches the issue by number and mirrors it onto the record.
    ///
    /// A 404 is not an error: the identifier is cleared and
    /// [`ReadOutcome::Gone`] returned. Any other failure leaves the record
    /// untouched.
    pub async fn read(
        &self,
        ctx: &RequestContext,
        resource: &mut IssueResource,
        conditional: Option<&str>,
    ) -> Result<ReadOutcome> {
        debug!(id = %resource.id, key = %resource.key(), "reading issue");

        let result = ctx
            .run(self.client.get_issue(
                &resource.owner,
                &resource.repository,
                resource.number,
                conditional,
            ))
            .await;
        let fetched = match result {
            Ok(fetched) => fetched,
            Err(ResourceError::Api(err)) if err.is_not_found() => {
                warn!(
                    id = %resource.id,
                    key = %resource.key(),
                    "removing issue from state because it no longer exists in GitHub"
                );
                resource.id.clear();
                return Ok(ReadOutcome::Gone);
            }
            Err(err) => return Err(err),
        };
        let issue = fetched.value;

        if resource.id != issue.node_id {
            if !resource.id.is_empty() && !resource.has_import_key() {
                return Err(ResourceError::IdentityConflict {
                    key: resource.key(),
                    expected: resource.id.clone(),
                    found: issue.node_id,
                });
            }
            debug!(from = %resource.id, to = %issue.node_id, "binding record to node id");
            resource.id = issue.node_id;
        }

        resource.labels = labels_to_names(&issue.labels);
        resource.assignees = users_to_names(&issue.assignees);
        resource.state = issue.state;
        resource.body = issue.body.unwrap_or_default();
        resource.title = issue.title;
        resource.milestone_number = issue.milestone.map_or(0, |milestone| milestone.number);
        resource.number = issue.number;
        resource.issue_id = issue.id;
        if let Some(etag) = fetched.etag {
            resource.etag = etag;
        }

        Ok(ReadOutcome::Present)
    }

    /// Sends every desired field in one edit call, then re-reads.
    ///
    /// Labels and assignees replace the remote lists wholesale.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        resource: &mut IssueResource,
    ) -> Result<ReadOutcome> {
        resource.validate()?;
        debug!(id = %resource.id, key = %resource.key(), "updating issue");

        let request = IssueRequest {
            title: resource.title.clone(),
            body: resource.body.clone(),
            state: Some(resource.state),
            labels: resource.labels.clone(),
            assignees: resource.assignees.clone(),
            milestone: milestone_from_number(resource.milestone_number),
        };
        ctx.run(self.client.edit_issue(
            &resource.owner,
            &resource.repository,
            resource.number,
            &request,
        ))
        .await?;

        self.read(ctx, resource, None).await
    }

    /// Locks the issue with the record's `lock_reason`. The remote issue is
    /// never removed and the record is not modified.
    pub async fn delete(&self, ctx: &RequestContext, resource: &IssueResource) -> Result<()> {
        resource.validate_identity()?;
        debug!(
            id = %resource.id,
            key = %resource.key(),
            reason = %resource.lock_reason,
            "locking issue"
        );

        let options = LockIssueOptions {
            lock_reason: resource.lock_reason.clone(),
        };
        ctx.run(self.client.lock_issue(
            &resource.owner,
            &resource.repository,
            resource.number,
            &options,
        ))
        .await
    }
}

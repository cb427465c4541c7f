use crate::resource::{IssueConfig, IssueResource};

/// The verb a caller has to run to converge `prior` onto the desired config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceAction {
    Create,
    Update,
    /// Owner or repository changed: lock the old issue, then create a new one.
    Replace,
    NoOp,
}

pub fn plan_change(prior: Option<&IssueResource>, desired: &IssueConfig) -> ResourceAction {
    match prior {
        None => ResourceAction::Create,
        Some(resource) if resource.is_gone() => ResourceAction::Create,
        Some(resource)
            if resource.owner != desired.owner || resource.repository != desired.repository =>
        {
            ResourceAction::Replace
        }
        Some(resource) if mirrors(resource, desired) => ResourceAction::NoOp,
        Some(_) => ResourceAction::Update,
    }
}

fn mirrors(resource: &IssueResource, desired: &IssueConfig) -> bool {
    resource.title == desired.title
        && resource.body == desired.body
        && resource.state == desired.state
        && resource.labels == desired.labels
        && resource.assignees == desired.assignees
        && resource.milestone_number == desired.milestone_number
        && resource.lock_reason == desired.lock_reason
}

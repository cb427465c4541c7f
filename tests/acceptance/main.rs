use cucumber::World;
use issuekeeper::github::InMemoryIssues;
use issuekeeper::{
    ImportError, IssueConfig, IssueController, IssueResource, ReadOutcome, ResourceError,
};
use std::fmt;
use std::sync::Arc;

#[derive(Default, World)]
pub struct IssueWorld {
    pub api: Arc<InMemoryIssues>,
    pub desired: Option<IssueConfig>,
    pub resource: Option<IssueResource>,
    pub refreshed: Vec<IssueResource>,
    pub last_outcome: Option<ReadOutcome>,
    pub last_error: Option<ResourceError>,
    pub import_result: Option<Result<IssueResource, ImportError>>,
}

impl IssueWorld {
    pub fn controller(&self) -> IssueController {
        IssueController::new(self.api.clone())
    }
}

impl fmt::Debug for IssueWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssueWorld")
            .field("desired", &self.desired)
            .field("resource", &self.resource)
            .field("last_outcome", &self.last_outcome)
            .field("last_error", &self.last_error)
            .field("import_result", &self.import_result)
            .finish_non_exhaustive()
    }
}

#[tokio::main]
async fn main() {
    issuekeeper::logging::init("issuekeeper=warn");
    IssueWorld::run("features").await;
}

mod steps;

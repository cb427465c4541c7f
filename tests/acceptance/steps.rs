use crate::IssueWorld;
use cucumber::{given, then, when};
use issuekeeper::{
    ApiError, ImportError, IssueConfig, IssueResource, IssueState, ReadOutcome, RequestContext,
    ResourceError,
};

fn names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn desired(world: &mut IssueWorld) -> &mut IssueConfig {
    world
        .desired
        .as_mut()
        .expect("a desired issue must be declared first")
}

fn tracked(world: &IssueWorld) -> &IssueResource {
    world
        .resource
        .as_ref()
        .expect("no issue is being tracked")
}

fn record(world: &mut IssueWorld, result: Result<ReadOutcome, ResourceError>) {
    match result {
        Ok(outcome) => {
            world.last_outcome = Some(outcome);
            world.last_error = None;
        }
        Err(err) => {
            world.last_outcome = None;
            world.last_error = Some(err);
        }
    }
}

async fn create(world: &mut IssueWorld) {
    let config = world
        .desired
        .clone()
        .expect("a desired issue must be declared first");
    let mut resource = IssueResource::planned(&config);
    let result = world
        .controller()
        .create(&RequestContext::background(), &mut resource)
        .await;
    world.resource = Some(resource);
    record(world, result);
}

#[given(regex = r#"^a desired issue "([^"]*)" with body "([^"]*)" in "([^/"]+)/([^/"]+)"$"#)]
async fn given_desired_issue(
    world: &mut IssueWorld,
    title: String,
    body: String,
    owner: String,
    repository: String,
) {
    world.desired = Some(IssueConfig::new(owner, repository, title, body));
}

#[given(regex = r#"^the desired labels are "([^"]*)"$"#)]
async fn given_desired_labels(world: &mut IssueWorld, labels: String) {
    desired(world).labels = names(&labels);
}

#[given(regex = r#"^the desired assignees are "([^"]*)"$"#)]
async fn given_desired_assignees(world: &mut IssueWorld, assignees: String) {
    desired(world).assignees = names(&assignees);
}

#[given(regex = r"^the desired milestone is (\d+)$")]
async fn given_desired_milestone(world: &mut IssueWorld, milestone: u64) {
    desired(world).milestone_number = milestone;
}

#[given(regex = r#"^the desired state is "([^"]*)"$"#)]
async fn given_desired_state(world: &mut IssueWorld, state: String) {
    desired(world).state = state.parse::<IssueState>().expect("valid issue state");
}

#[given(regex = r#"^a created issue "([^"]*)" in "([^/"]+)/([^/"]+)"$"#)]
async fn given_created_issue(world: &mut IssueWorld, title: String, owner: String, repo: String) {
    world.desired = Some(IssueConfig::new(owner, repo, title, "body"));
    create(world).await;
    assert!(world.last_error.is_none(), "create failed: {:?}", world.last_error);
}

#[given(regex = r#"^a created issue "([^"]*)" in "([^/"]+)/([^/"]+)" assigned to "([^"]*)"$"#)]
async fn given_created_assigned_issue(
    world: &mut IssueWorld,
    title: String,
    owner: String,
    repo: String,
    assignees: String,
) {
    let mut config = IssueConfig::new(owner, repo, title, "body");
    config.assignees = names(&assignees);
    world.desired = Some(config);
    create(world).await;
    assert_eq!(tracked(world).assignees, names(&assignees));
}

#[given("the issue is deleted on the remote")]
async fn given_deleted_on_remote(world: &mut IssueWorld) {
    let resource = tracked(world).clone();
    world
        .api
        .remove(&resource.owner, &resource.repository, resource.number)
        .expect("remote issue exists");
}

#[given(regex = r#"^the remote rejects the next call with status (\d+) "([^"]*)"$"#)]
async fn given_remote_rejects(world: &mut IssueWorld, status: u16, message: String) {
    world.api.fail_next(ApiError::Status {
        operation: "edit issue".to_string(),
        status,
        message,
    });
}

#[when("the issue is created")]
async fn when_created(world: &mut IssueWorld) {
    create(world).await;
}

#[when(regex = r"^the issue is refreshed(?: again)?$")]
async fn when_refreshed(world: &mut IssueWorld) {
    let mut resource = tracked(world).clone();
    let result = world
        .controller()
        .refresh(&RequestContext::background(), &mut resource)
        .await;
    world.refreshed.push(resource.clone());
    world.resource = Some(resource);
    record(world, result);
}

#[when("the issue is updated")]
async fn when_updated(world: &mut IssueWorld) {
    let config = desired(world).clone();
    let mut resource = tracked(world).clone();
    resource.apply(&config);
    let result = world
        .controller()
        .update(&RequestContext::background(), &mut resource)
        .await;
    world.resource = Some(resource);
    record(world, result);
}

#[when("the issue is deleted")]
async fn when_deleted(world: &mut IssueWorld) {
    let resource = tracked(world).clone();
    let result = world
        .controller()
        .delete(&RequestContext::background(), &resource)
        .await;
    record(world, result.map(|()| ReadOutcome::Present));
}

#[when(regex = r#"^"([^"]*)" is imported$"#)]
async fn when_imported(world: &mut IssueWorld, key: String) {
    world.import_result = Some(IssueResource::import(&key));
}

#[when("the imported issue is read")]
async fn when_imported_read(world: &mut IssueWorld) {
    let mut resource = match &world.import_result {
        Some(Ok(resource)) => resource.clone(),
        other => panic!("expected a successful import, got {other:?}"),
    };
    let result = world
        .controller()
        .read(&RequestContext::background(), &mut resource, None)
        .await;
    world.resource = Some(resource);
    record(world, result);
}

#[then("the last operation succeeds")]
async fn then_succeeds(world: &mut IssueWorld) {
    assert!(
        world.last_error.is_none(),
        "expected success, got {:?}",
        world.last_error
    );
}

#[then(regex = r#"^the last error is "(.*)"$"#)]
async fn then_last_error(world: &mut IssueWorld, expected: String) {
    let err = world.last_error.as_ref().expect("an error was expected");
    assert_eq!(err.to_string(), expected);
}

#[then(regex = r#"^the tracked state is "([^"]*)"$"#)]
async fn then_state(world: &mut IssueWorld, state: String) {
    assert_eq!(tracked(world).state.as_str(), state);
}

#[then(regex = r#"^the tracked title is "([^"]*)"$"#)]
async fn then_title(world: &mut IssueWorld, title: String) {
    assert_eq!(tracked(world).title, title);
}

#[then(regex = r#"^the tracked body is "([^"]*)"$"#)]
async fn then_body(world: &mut IssueWorld, body: String) {
    assert_eq!(tracked(world).body, body);
}

#[then(regex = r#"^the tracked labels are "([^"]*)"$"#)]
async fn then_labels(world: &mut IssueWorld, labels: String) {
    assert_eq!(tracked(world).labels, names(&labels));
}

#[then(regex = r#"^the tracked assignees are "([^"]*)"$"#)]
async fn then_assignees(world: &mut IssueWorld, assignees: String) {
    assert_eq!(tracked(world).assignees, names(&assignees));
}

#[then(regex = r"^the tracked milestone is (\d+)$")]
async fn then_milestone(world: &mut IssueWorld, milestone: u64) {
    assert_eq!(tracked(world).milestone_number, milestone);
}

#[then("the tracked identifier is the remote node id")]
async fn then_identifier_is_node_id(world: &mut IssueWorld) {
    let resource = tracked(world);
    let remote = world
        .api
        .issue(&resource.owner, &resource.repository, resource.number)
        .expect("remote issue exists");
    assert_eq!(resource.id, remote.node_id);
}

#[then("the tracked identifier is empty")]
async fn then_identifier_empty(world: &mut IssueWorld) {
    assert_eq!(world.last_outcome, Some(ReadOutcome::Gone));
    assert!(tracked(world).id.is_empty());
}

#[then("the tracked number and issue id are positive")]
async fn then_computed_positive(world: &mut IssueWorld) {
    let resource = tracked(world);
    assert!(resource.number > 0);
    assert!(resource.issue_id > 0);
}

#[then("both refreshes produce the same record")]
async fn then_refreshes_equal(world: &mut IssueWorld) {
    assert_eq!(world.refreshed.len(), 2);
    assert_eq!(world.refreshed[0], world.refreshed[1]);
}

#[then(regex = r#"^the remote issue is locked with reason "([^"]*)"$"#)]
async fn then_locked(world: &mut IssueWorld, reason: String) {
    let resource = tracked(world);
    let remote = world
        .api
        .issue(&resource.owner, &resource.repository, resource.number)
        .expect("locking must not remove the issue");
    assert!(remote.locked);
    assert_eq!(remote.active_lock_reason.as_deref(), Some(reason.as_str()));
}

#[then(
    regex = r#"^the import succeeds with owner "([^"]*)", repository "([^"]*)", number (\d+) and identifier "([^"]*)"$"#
)]
async fn then_import_succeeds(
    world: &mut IssueWorld,
    owner: String,
    repository: String,
    number: u64,
    id: String,
) {
    let resource = match &world.import_result {
        Some(Ok(resource)) => resource,
        other => panic!("expected a successful import, got {other:?}"),
    };
    assert_eq!(resource.owner, owner);
    assert_eq!(resource.repository, repository);
    assert_eq!(resource.number, number);
    assert_eq!(resource.id, id);
}

#[then("the import fails with a format error")]
async fn then_import_format_error(world: &mut IssueWorld) {
    assert!(
        matches!(world.import_result, Some(Err(ImportError::Format(_)))),
        "got {:?}",
        world.import_result
    );
}

#[then("the import fails with a number error")]
async fn then_import_number_error(world: &mut IssueWorld) {
    assert!(
        matches!(world.import_result, Some(Err(ImportError::Number { .. }))),
        "got {:?}",
        world.import_result
    );
}

use crate::github::issues::{GitHubLabel, GitHubUser};

/// Projects assignees onto their login names, one entry per user.
pub fn users_to_names(users: &[GitHubUser]) -> Vec<String> {
    users
        .iter()
        .map(|user| user.login.clone().unwrap_or_default())
        .collect()
}

/// Projects labels onto their names, one entry per label.
pub fn labels_to_names(labels: &[GitHubLabel]) -> Vec<String> {
    labels
        .iter()
        .map(|label| label.name.clone().unwrap_or_default())
        .collect()
}

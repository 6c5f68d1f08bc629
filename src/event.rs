use std::path::Path;

use anyhow::{Context, Result};

use crate::types::{PushEvent, Repo};

/// Loads the push payload that the CI runner writes to `GITHUB_EVENT_PATH`.
pub async fn read_push_event(path: &Path) -> Result<PushEvent> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read event payload '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse event payload '{}'", path.display()))
}

impl PushEvent {
    pub fn repo(&self) -> Result<Repo> {
        Repo::parse(&self.repository.full_name).with_context(|| {
            format!(
                "Invalid repository in event payload: '{}'",
                self.repository.full_name
            )
        })
    }

    /// The pushed head commit, if the payload names a real one.
    ///
    /// Branch deletions report an all-zero SHA, which can never be a merge
    /// commit.
    pub fn commit_sha(&self) -> Option<&str> {
        self.after
            .as_deref()
            .filter(|sha| !sha.is_empty() && !sha.chars().all(|c| c == '0'))
    }
}

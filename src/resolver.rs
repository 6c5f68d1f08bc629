use anyhow::{Context, Result};
use tracing::debug;

use crate::types::{Forge, PullRequest, Repo};

/// Finds the pull request whose merge commit is `sha`.
///
/// Scans every pull request in the repository (open, closed and merged) in
/// listing order and returns the first exact, case-sensitive match. A
/// missing SHA or a SHA nobody merged is `Ok(None)`; only listing failures
/// are errors.
pub async fn find_pr_by_commit<F>(
    forge: &F,
    repo: &Repo,
    sha: Option<&str>,
) -> Result<Option<PullRequest>>
where
    F: Forge + Sync,
{
    let Some(sha) = sha else {
        return Ok(None);
    };

    let pulls = forge
        .list_pull_requests(repo)
        .await
        .with_context(|| format!("Failed to list pull requests for {repo}"))?;

    debug!(repo = %repo, count = pulls.len(), "Scanning pull requests for merge commit");

    Ok(pulls
        .into_iter()
        .find(|pr| pr.merge_commit_sha.as_deref() == Some(sha)))
}

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::{
    notifier::{TemplateVars, post_comment_if_new, render_comment},
    resolver::find_pr_by_commit,
    types::{
        ChangedFile, Forge, IndexingService, NotifyConfig, PipelineOutcome, PushEvent,
        SyncRequest,
    },
};

/// The indexing service and the source it should refresh.
pub struct SyncTarget<'a> {
    pub service: &'a (dyn IndexingService + Send + Sync),
    pub source_id: &'a str,
}

/// Keeps files under `prefix`. A rename counts if either side of it is
/// under the prefix, so files moved out of the tree still get dropped from
/// the index.
pub fn filter_changed_files(files: Vec<ChangedFile>, prefix: &str) -> Vec<ChangedFile> {
    files
        .into_iter()
        .filter(|file| {
            file.path.starts_with(prefix)
                || file
                    .previous_path
                    .as_deref()
                    .is_some_and(|previous| previous.starts_with(prefix))
        })
        .collect()
}

/// Runs one push event through sync, resolution and notification.
///
/// Benign skips come back as a [`PipelineOutcome`]; only upstream failures
/// are errors.
pub async fn run_pipeline<F>(
    event: &PushEvent,
    config: &NotifyConfig,
    forge: &F,
    sync: Option<&SyncTarget<'_>>,
) -> Result<PipelineOutcome>
where
    F: Forge + Sync,
{
    let repo = event.repo()?;
    let Some(sha) = event.commit_sha() else {
        info!(repo = %repo, "Push event carries no commit SHA");
        return Ok(PipelineOutcome::NoCommitSha);
    };

    let mut source_name = String::new();

    if config.require_sync_success {
        let Some(target) = sync else {
            bail!("Sync is required but no indexing service is configured");
        };

        let files = forge
            .list_changed_files(&repo, sha)
            .await
            .with_context(|| format!("Failed to list files changed by {sha}"))?;
        let files = filter_changed_files(files, &config.file_path_filter);

        if files.is_empty() {
            info!(sha, filter = %config.file_path_filter, "No changed files match the path filter");
            return Ok(PipelineOutcome::NothingToSync);
        }

        let request = SyncRequest {
            source_id: target.source_id.to_string(),
            commit_sha: sha.to_string(),
            files,
        };
        let result = target
            .service
            .sync(&request)
            .await
            .context("Failed to trigger source sync")?;

        if !result.success {
            info!(sha, "Sync was not successful, skipping comment");
            return Ok(PipelineOutcome::SyncFailed(result));
        }
        source_name = result.source_display_name;
    }

    let Some(pr) = find_pr_by_commit(forge, &repo, Some(sha)).await? else {
        info!(sha, "No PR found for commit");
        return Ok(PipelineOutcome::NoPullRequest {
            sha: sha.to_string(),
        });
    };

    info!(sha, pr = pr.number, title = %pr.title, "Resolved pull request");

    let repo_name = repo.to_string();
    let body = render_comment(
        &config.comment_template,
        &TemplateVars {
            source: &source_name,
            sha,
            repo: &repo_name,
        },
    );
    let outcome = post_comment_if_new(forge, &repo, &pr, &body).await?;

    Ok(PipelineOutcome::Commented { pr, outcome })
}

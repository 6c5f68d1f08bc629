use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::types::{CommentOutcome, Forge, PullRequest, Repo};

/// Comment used when no indexing service is involved.
pub const DEFAULT_COMMENT: &str = "Inkeep sync has been started.";

/// Comment used when the post is gated on a successful sync.
pub const DEFAULT_SYNC_COMMENT: &str = "[<img src=\"https://inkeep.com/favicon.ico\" width=\"16\" height=\"16\" alt=\"Inkeep\">](https://inkeep.com) Sync of **{source}** has been started.";

/// Values substituted into a comment template.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars<'a> {
    pub source: &'a str,
    pub sha: &'a str,
    pub repo: &'a str,
}

/// Replaces `{source}`, `{sha}` and `{repo}` literally. Anything else in the
/// template is left untouched.
pub fn render_comment(template: &str, vars: &TemplateVars<'_>) -> String {
    let placeholders = [
        ("{source}", vars.source),
        ("{sha}", vars.sha),
        ("{repo}", vars.repo),
    ];

    // Single pass: substituted values are copied out verbatim, never rescanned.
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match placeholders.iter().find(|(name, _)| tail.starts_with(name)) {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Posts `body` on the pull request unless a comment with exactly the same
/// body already exists.
pub async fn post_comment_if_new<F>(
    forge: &F,
    repo: &Repo,
    pr: &PullRequest,
    body: &str,
) -> Result<CommentOutcome>
where
    F: Forge + Sync,
{
    let existing = forge
        .list_comments(repo, pr.number)
        .await
        .with_context(|| format!("Failed to list comments on {repo}#{}", pr.number))?;

    debug!(pr = pr.number, count = existing.len(), "Checking existing comments");

    if existing.iter().any(|comment| comment.body == body) {
        info!(pr = pr.number, "Pull request already has this comment");
        return Ok(CommentOutcome::SkippedDuplicate);
    }

    forge
        .create_comment(repo, pr.number, body)
        .await
        .with_context(|| format!("Failed to create comment on {repo}#{}", pr.number))?;

    info!(pr = pr.number, url = %pr.url, "Posted status comment");
    Ok(CommentOutcome::Posted)
}

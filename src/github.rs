use std::process::Command;

use anyhow::{Context, Result};
use async_trait::async_trait;
use octocrab::{
    Octocrab,
    models::repos::{DiffEntry, DiffEntryStatus},
    params::State,
};

use crate::types::{ChangeKind, ChangedFile, Comment, Forge, PullRequest, Repo};

/// First non-empty token among the given environment values, in order.
fn token_from_env<I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    values.into_iter().flatten().find(|token| !token.is_empty())
}

pub fn get_github_token() -> Result<String> {
    // Actions always provides GITHUB_TOKEN; gh is a convenience for local runs.
    let from_env = token_from_env([
        std::env::var("GITHUB_TOKEN").ok(),
        std::env::var("GH_TOKEN").ok(),
    ]);
    if let Some(token) = from_env {
        return Ok(token);
    }

    let output = Command::new("gh").args(["auth", "token"]).output()?;

    if !output.status.success() {
        anyhow::bail!("Failed to get GitHub token from gh CLI. Please run 'gh auth login' first");
    }

    let token = String::from_utf8(output.stdout)?.trim().to_string();

    if token.is_empty() {
        anyhow::bail!("Empty token returned from gh CLI");
    }

    Ok(token)
}

/// [`Forge`] backed by the GitHub REST API.
#[derive(Clone)]
pub struct GitHub {
    client: Octocrab,
}

impl GitHub {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Creates an authenticated client using available credentials.
    pub fn from_env() -> Result<Self> {
        let token = get_github_token().context("Failed to obtain GitHub authentication token")?;
        let client = Octocrab::builder()
            .personal_token(token)
            .build()
            .context("Failed to create GitHub client")?;
        Ok(Self::new(client))
    }
}

fn convert_diff_entry(entry: DiffEntry) -> Option<ChangedFile> {
    let kind = match entry.status {
        DiffEntryStatus::Added | DiffEntryStatus::Copied => ChangeKind::Added,
        DiffEntryStatus::Removed => ChangeKind::Removed,
        DiffEntryStatus::Renamed => ChangeKind::Renamed,
        DiffEntryStatus::Unchanged => return None,
        _ => ChangeKind::Modified,
    };
    Some(ChangedFile {
        path: entry.filename,
        kind,
        previous_path: entry.previous_filename,
    })
}

#[async_trait]
impl Forge for GitHub {
    async fn list_pull_requests(&self, repo: &Repo) -> Result<Vec<PullRequest>> {
        let first_page = self
            .client
            .pulls(repo.owner(), repo.name())
            .list()
            .state(State::All)
            .per_page(100)
            .send()
            .await?;
        let pulls = self.client.all_pages(first_page).await?;

        Ok(pulls
            .into_iter()
            .map(|pr| PullRequest {
                number: pr.number,
                title: pr.title.unwrap_or_default(),
                url: pr.html_url.map(|url| url.to_string()).unwrap_or_default(),
                merge_commit_sha: pr.merge_commit_sha,
            })
            .collect())
    }

    async fn list_comments(&self, repo: &Repo, pr_number: u64) -> Result<Vec<Comment>> {
        let first_page = self
            .client
            .issues(repo.owner(), repo.name())
            .list_comments(pr_number)
            .per_page(100)
            .send()
            .await?;
        let comments = self.client.all_pages(first_page).await?;

        Ok(comments
            .into_iter()
            .map(|comment| Comment {
                body: comment.body.unwrap_or_default(),
            })
            .collect())
    }

    async fn create_comment(&self, repo: &Repo, pr_number: u64, body: &str) -> Result<()> {
        self.client
            .issues(repo.owner(), repo.name())
            .create_comment(pr_number, body)
            .await?;
        Ok(())
    }

    async fn list_changed_files(&self, repo: &Repo, sha: &str) -> Result<Vec<ChangedFile>> {
        let commit = self
            .client
            .commits(repo.owner(), repo.name())
            .get(sha)
            .await?;

        Ok(commit
            .files
            .unwrap_or_default()
            .into_iter()
            .filter_map(convert_diff_entry)
            .collect())
    }
}

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

/// Errors produced when parsing an `owner/name` repository string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    EmptyOwner,
    EmptyName,
    InvalidFormat(String),
}

impl fmt::Display for RepoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoError::EmptyOwner => write!(f, "repository owner cannot be empty"),
            RepoError::EmptyName => write!(f, "repository name cannot be empty"),
            RepoError::InvalidFormat(s) => {
                write!(f, "expected 'owner/name', got '{s}'")
            }
        }
    }
}

impl std::error::Error for RepoError {}

/// A GitHub repository identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repo {
    owner: String,
    name: String,
}

impl Repo {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, RepoError> {
        let owner = owner.into();
        let name = name.into();
        if owner.trim().is_empty() {
            return Err(RepoError::EmptyOwner);
        }
        if name.trim().is_empty() {
            return Err(RepoError::EmptyName);
        }
        Ok(Self { owner, name })
    }

    /// Parses the `full_name` form used in webhook payloads.
    pub fn parse(full_name: &str) -> Result<Self, RepoError> {
        match full_name.split('/').collect::<Vec<_>>().as_slice() {
            [owner, name] => Self::new(*owner, *name),
            _ => Err(RepoError::InvalidFormat(full_name.to_string())),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRepository {
    pub full_name: String,
}

/// The subset of a `push` webhook payload this tool reads.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    pub repository: EventRepository,
    /// SHA of the branch head after the push. Absent for some synthetic
    /// events, and all zeros when a branch is deleted.
    #[serde(default)]
    pub after: Option<String>,
}

/// A pull request as seen by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub merge_commit_sha: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub body: String,
}

/// How a file was touched by a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
    Renamed,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Removed => "removed",
            ChangeKind::Renamed => "renamed",
        }
    }
}

/// One entry of a commit's changed-file list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: String,
    pub kind: ChangeKind,
    /// Previous path for renames.
    pub previous_path: Option<String>,
}

/// Input for one incremental sync round trip.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub source_id: String,
    pub commit_sha: String,
    pub files: Vec<ChangedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    pub success: bool,
    pub source_display_name: String,
    pub source_sync_job_id: Option<String>,
    pub index_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentOutcome {
    Posted,
    SkippedDuplicate,
}

/// Terminal state of one pipeline run. Every variant is a clean exit.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    NoCommitSha,
    NothingToSync,
    SyncFailed(SyncResult),
    NoPullRequest { sha: String },
    Commented {
        pr: PullRequest,
        outcome: CommentOutcome,
    },
}

/// Behaviour switches that distinguish the different notification flavours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyConfig {
    pub require_sync_success: bool,
    pub file_path_filter: String,
    pub comment_template: String,
}

/// The source-control host operations the pipeline depends on.
#[async_trait]
pub trait Forge {
    /// Lists pull requests in every state, in the host's default order.
    async fn list_pull_requests(&self, repo: &Repo) -> anyhow::Result<Vec<PullRequest>>;

    /// Returns every issue comment on the pull request, oldest first.
    async fn list_comments(&self, repo: &Repo, pr_number: u64) -> anyhow::Result<Vec<Comment>>;

    async fn create_comment(&self, repo: &Repo, pr_number: u64, body: &str)
    -> anyhow::Result<()>;

    async fn list_changed_files(&self, repo: &Repo, sha: &str)
    -> anyhow::Result<Vec<ChangedFile>>;
}

/// The content-indexing service, seen as a single sync round trip.
#[async_trait]
pub trait IndexingService {
    async fn sync(&self, request: &SyncRequest) -> anyhow::Result<SyncResult>;
}

//! docsync-notify: pull request status comments for documentation syncs.
//!
//! Runs once per push event. Resolves the pull request whose merge commit
//! was pushed, optionally asks the content-indexing service to ingest the
//! changed documentation, and leaves a status comment on the pull request
//! unless the same comment is already there.

pub mod cli;
pub mod event;
pub mod github;
pub mod graphql;
pub mod indexing;
pub mod notifier;
pub mod pipeline;
pub mod resolver;
pub mod types;

pub use cli::{RunSpec, SyncSpec, parse_args};
pub use event::read_push_event;
pub use github::GitHub;
pub use indexing::{IndexingClient, IndexingConfig};
pub use notifier::{post_comment_if_new, render_comment};
pub use pipeline::{SyncTarget, filter_changed_files, run_pipeline};
pub use resolver::find_pr_by_commit;
pub use types::{
    ChangeKind, ChangedFile, Comment, CommentOutcome, EventRepository, Forge, IndexingService,
    NotifyConfig, PipelineOutcome, PullRequest, PushEvent, Repo, RepoError, SyncRequest,
    SyncResult,
};

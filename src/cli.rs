use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{
    ArgAction, Args, CommandFactory, Parser, builder::FalseyValueParser, error::ErrorKind,
};
use url::Url;

use crate::{
    indexing::{DEFAULT_API_URL, IndexingConfig},
    notifier::{DEFAULT_COMMENT, DEFAULT_SYNC_COMMENT},
    types::NotifyConfig,
};

const BUILD_INFO_HUMAN: &str = env!("BUILD_INFO_HUMAN");

/// Directory that relative comment template paths are resolved against.
const TEMPLATE_DIR: &str = ".github/workflows";

const DEFAULT_PATH_FILTER: &str = "docs/";
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// GitHub Actions exports every declared input, so an unset input arrives as
// an empty `INPUT_*` variable. Boolean inputs therefore accept an optional
// value where empty means false, and every other input is read as a string
// and falls back to its default when blank.

#[derive(Args, Debug, Clone, Default)]
struct SyncArgs {
    /// Only comment after the indexing service accepted a sync job
    #[arg(
        long = "require-sync-success",
        env = "INPUT_REQUIRE_SYNC_SUCCESS",
        action = ArgAction::Set,
        value_parser = FalseyValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true",
        default_value_t = false,
        value_name = "BOOL",
        help_heading = "Sync"
    )]
    pub require_sync_success: bool,

    /// Only files under this path prefix are sent to the indexing service [default: docs/]
    #[arg(
        long = "path-filter",
        env = "INPUT_PATH_FILTER",
        value_name = "PREFIX",
        help_heading = "Sync"
    )]
    pub path_filter: Option<String>,

    /// GraphQL endpoint of the indexing service [default: Inkeep management API]
    #[arg(
        long = "api-url",
        env = "INPUT_API_URL",
        value_name = "URL",
        help_heading = "Sync"
    )]
    pub api_url: Option<String>,

    /// API key for the indexing service
    #[arg(
        long = "api-key",
        env = "INPUT_API_KEY",
        hide_env_values = true,
        value_name = "KEY",
        help_heading = "Sync"
    )]
    pub api_key: Option<String>,

    /// Identifier of the source to sync
    #[arg(
        long = "source-id",
        env = "INPUT_SOURCE_ID",
        value_name = "ID",
        help_heading = "Sync"
    )]
    pub source_id: Option<String>,

    /// Organization alias sent with every indexing request
    #[arg(
        long = "organization-alias",
        env = "INPUT_ORGANIZATION_ALIAS",
        value_name = "ALIAS",
        help_heading = "Sync"
    )]
    pub organization_alias: Option<String>,

    /// Also rebuild the source's index once the sync job is accepted
    #[arg(
        long = "create-indexing-job",
        env = "INPUT_CREATE_INDEXING_JOB",
        action = ArgAction::Set,
        value_parser = FalseyValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true",
        default_value_t = false,
        value_name = "BOOL",
        help_heading = "Sync"
    )]
    pub create_indexing_job: bool,

    /// Retries for transient indexing service failures [default: 3]
    #[arg(
        long = "max-retries",
        env = "INPUT_MAX_RETRIES",
        value_name = "NUM",
        help_heading = "Sync"
    )]
    pub max_retries: Option<String>,

    /// Per-request timeout for the indexing service, in seconds [default: 30]
    #[arg(
        long,
        env = "INPUT_TIMEOUT",
        value_name = "SECONDS",
        help_heading = "Sync"
    )]
    pub timeout: Option<String>,
}

#[derive(Parser, Default, Debug)]
#[command(
    name = "docsync-notify",
    about = "Find the pull request behind a pushed commit, optionally sync the changed docs to the indexing service, and leave a status comment"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
struct CliArgs {
    /// Path to the push event payload
    #[arg(long = "event-path", env = "GITHUB_EVENT_PATH", value_name = "FILE")]
    pub event_path: PathBuf,

    /// Comment body; {source}, {sha} and {repo} are substituted
    #[arg(
        long = "comment-template",
        env = "INPUT_COMMENT_TEMPLATE",
        value_name = "TEXT"
    )]
    pub comment_template: Option<String>,

    /// File holding the comment body, relative to .github/workflows; wins over --comment-template
    #[arg(
        long = "comment-template-file",
        env = "INPUT_COMMENT_TEMPLATE_FILE",
        value_name = "FILE"
    )]
    pub comment_template_file: Option<String>,

    #[command(flatten)]
    pub sync: SyncArgs,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

/// Everything the binary needs for one run.
#[derive(Debug)]
pub struct RunSpec {
    pub event_path: PathBuf,
    pub notify: NotifyConfig,
    pub sync: Option<SyncSpec>,
    pub debug: bool,
}

#[derive(Debug)]
pub struct SyncSpec {
    pub source_id: String,
    pub indexing: IndexingConfig,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Wraps a validation failure as a clap usage error so it exits with 2.
fn usage_error(kind: ErrorKind, message: impl std::fmt::Display) -> anyhow::Error {
    CliArgs::command().error(kind, message).into()
}

fn parse_or_default<T: FromStr>(value: &Option<String>, default: T, flag: &str) -> Result<T> {
    match non_empty(value) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| {
            usage_error(
                ErrorKind::ValueValidation,
                format!("invalid value '{raw}' for '{flag}'"),
            )
        }),
    }
}

impl CliArgs {
    pub fn validate(&self) -> Result<()> {
        if self.sync.require_sync_success {
            let required = [
                ("--api-key", &self.sync.api_key),
                ("--source-id", &self.sync.source_id),
                ("--organization-alias", &self.sync.organization_alias),
            ];
            for (flag, value) in required {
                if non_empty(value).is_none() {
                    return Err(usage_error(
                        ErrorKind::MissingRequiredArgument,
                        format!("{flag} is required with --require-sync-success"),
                    ));
                }
            }
        }

        Ok(())
    }
}

fn load_template(file: &Path) -> Result<String> {
    let path = Path::new(TEMPLATE_DIR).join(file);
    std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read comment template '{}'", path.display()))
}

fn resolve_comment_template(cli: &CliArgs) -> Result<String> {
    if let Some(file) = non_empty(&cli.comment_template_file) {
        return load_template(Path::new(file));
    }

    if let Some(template) = non_empty(&cli.comment_template) {
        return Ok(template.to_string());
    }

    Ok(if cli.sync.require_sync_success {
        DEFAULT_SYNC_COMMENT.to_string()
    } else {
        DEFAULT_COMMENT.to_string()
    })
}

fn build_sync_spec(args: &SyncArgs) -> Result<Option<SyncSpec>> {
    if !args.require_sync_success {
        return Ok(None);
    }

    let raw_url = non_empty(&args.api_url).unwrap_or(DEFAULT_API_URL);
    let api_url = Url::parse(raw_url).map_err(|e| {
        usage_error(
            ErrorKind::ValueValidation,
            format!("Invalid indexing API URL '{raw_url}': {e}"),
        )
    })?;

    // validate() guarantees these are present.
    let required = |value: &Option<String>| non_empty(value).unwrap_or_default().to_string();

    Ok(Some(SyncSpec {
        source_id: required(&args.source_id),
        indexing: IndexingConfig {
            api_url,
            api_key: required(&args.api_key),
            organization_alias: required(&args.organization_alias),
            create_indexing_job: args.create_indexing_job,
            max_retries: parse_or_default(&args.max_retries, DEFAULT_MAX_RETRIES, "--max-retries")?,
            timeout: Duration::from_secs(parse_or_default(
                &args.timeout,
                DEFAULT_TIMEOUT_SECS,
                "--timeout",
            )?),
        },
    }))
}

fn build_run_spec(cli: CliArgs) -> Result<RunSpec> {
    cli.validate()?;

    let notify = NotifyConfig {
        require_sync_success: cli.sync.require_sync_success,
        file_path_filter: non_empty(&cli.sync.path_filter)
            .unwrap_or(DEFAULT_PATH_FILTER)
            .to_string(),
        comment_template: resolve_comment_template(&cli)?,
    };

    Ok(RunSpec {
        sync: build_sync_spec(&cli.sync)?,
        event_path: cli.event_path,
        notify,
        debug: cli.debug,
    })
}

/// Parses command-line arguments (falling back to the `INPUT_*` variables
/// GitHub Actions exports) into a validated run specification.
///
/// Usage problems, including inputs that are present but invalid, come back
/// as a [`clap::Error`] inside the `anyhow::Error`.
pub fn parse_args<I, T>(args: I) -> Result<RunSpec>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = CliArgs::try_parse_from(args)?;
    build_run_spec(cli)
}

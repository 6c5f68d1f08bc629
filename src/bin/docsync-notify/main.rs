use docsync_notify::{
    CommentOutcome, GitHub, IndexingClient, PipelineOutcome, SyncTarget, parse_args,
    read_push_event, run_pipeline,
};
use tracing::info;

fn handle_clap_help_version(clap_err: &clap::Error) -> ! {
    use clap::error::ErrorKind;
    match clap_err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            print!("{clap_err}");
            std::process::exit(0);
        }
        _ => {
            eprint!("{clap_err}");
            std::process::exit(2);
        }
    }
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn log_outcome(outcome: &PipelineOutcome) {
    match outcome {
        PipelineOutcome::NoCommitSha => info!("Nothing to do: no commit in push event"),
        PipelineOutcome::NothingToSync => info!("Nothing to do: no matching files changed"),
        PipelineOutcome::SyncFailed(result) => info!(
            source = %result.source_display_name,
            "Sync did not succeed; no comment posted"
        ),
        PipelineOutcome::NoPullRequest { sha } => info!(sha = %sha, "No pull request to comment on"),
        PipelineOutcome::Commented { pr, outcome } => match outcome {
            CommentOutcome::Posted => info!(pr = pr.number, "Comment posted"),
            CommentOutcome::SkippedDuplicate => {
                info!(pr = pr.number, "Comment already present; skipped")
            }
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let spec = match parse_args(std::env::args()) {
        Ok(spec) => spec,
        Err(err) => {
            if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
                handle_clap_help_version(clap_err);
            } else {
                return Err(err);
            }
        }
    };

    init_tracing(spec.debug);

    let event = read_push_event(&spec.event_path).await?;
    let github = GitHub::from_env()?;

    let indexing = spec
        .sync
        .as_ref()
        .map(|sync| IndexingClient::new(sync.indexing.clone()))
        .transpose()?;
    let target = match (&spec.sync, &indexing) {
        (Some(sync), Some(client)) => Some(SyncTarget {
            service: client,
            source_id: &sync.source_id,
        }),
        _ => None,
    };

    let outcome = run_pipeline(&event, &spec.notify, &github, target.as_ref()).await?;
    log_outcome(&outcome);

    Ok(())
}

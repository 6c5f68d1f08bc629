use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    graphql::{
        CreateIndexingJobData, CreateSourceSyncJobData, GraphQLResponse, SourceData,
        build_manifest, create_indexing_job_request, create_source_sync_job_request,
        get_source_request,
    },
    types::{IndexingService, SyncRequest, SyncResult},
};

pub const DEFAULT_API_URL: &str = "https://api.management.inkeep.com/graphql";

const ORGANIZATION_ALIAS_HEADER: &str = "X-Organization-Alias";

/// Connection settings for the indexing service's management API.
#[derive(Debug, Clone)]
pub struct IndexingConfig {
    pub api_url: Url,
    pub api_key: String,
    pub organization_alias: String,
    pub create_indexing_job: bool,
    pub max_retries: u32,
    pub timeout: Duration,
}

/// GraphQL client for the content-indexing service.
///
/// Transient failures (connection errors, timeouts, 5xx and 429 responses)
/// are retried with exponential backoff up to `max_retries` times. Anything
/// else is returned to the caller on the first attempt.
pub struct IndexingClient {
    client: ClientWithMiddleware,
    config: IndexingConfig,
}

impl IndexingClient {
    pub fn new(config: IndexingConfig) -> Result<Self> {
        let base_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(250), Duration::from_secs(5))
            .build_with_max_retries(config.max_retries);

        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client, config })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        debug!(operation, url = %self.config.api_url, "Sending GraphQL request");

        let response = self
            .client
            .post(self.config.api_url.clone())
            .bearer_auth(&self.config.api_key)
            .header(ORGANIZATION_ALIAS_HEADER, &self.config.organization_alias)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("GraphQL request {operation} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("GraphQL request {operation} returned HTTP {status}: {text}");
        }

        let payload: GraphQLResponse<T> = response
            .json()
            .await
            .with_context(|| format!("Malformed response to GraphQL request {operation}"))?;
        payload.into_data(operation)
    }

    async fn create_indexing_job(&self, index_id: &str) -> Result<()> {
        let data: CreateIndexingJobData = self
            .execute("CreateIndexingJob", create_indexing_job_request(index_id))
            .await?;
        let payload = data.create_indexing_job;
        if payload.success {
            info!(
                index_id,
                job_id = payload.indexing_job.as_ref().map(|job| job.id.as_str()),
                "Indexing job created"
            );
        } else {
            warn!(index_id, "Indexing service declined the indexing job");
        }
        Ok(())
    }
}

#[async_trait]
impl IndexingService for IndexingClient {
    async fn sync(&self, request: &SyncRequest) -> Result<SyncResult> {
        let manifest = build_manifest(&request.commit_sha, &request.files);
        let data: CreateSourceSyncJobData = self
            .execute(
                "CreateSourceSyncJob",
                create_source_sync_job_request(&request.source_id, manifest),
            )
            .await?;
        let job = data.create_source_sync_job;
        let source_sync_job_id = job.source_sync_job.map(|job| job.id);

        if !job.success {
            warn!(source_id = %request.source_id, "Indexing service reported an unsuccessful sync job");
            return Ok(SyncResult {
                success: false,
                source_display_name: request.source_id.clone(),
                source_sync_job_id,
                index_id: None,
            });
        }

        info!(
            source_id = %request.source_id,
            job_id = source_sync_job_id.as_deref(),
            files = request.files.len(),
            "Source sync job created"
        );

        let source = self
            .execute::<SourceData>("GetSource", get_source_request(&request.source_id))
            .await?
            .source
            .with_context(|| format!("Source '{}' not found", request.source_id))?;

        let index_id = source.indexes.first().map(|index| index.id.clone());

        if self.config.create_indexing_job {
            match &index_id {
                Some(index_id) => self.create_indexing_job(index_id).await?,
                None => warn!(source_id = %request.source_id, "Source has no index to rebuild"),
            }
        }

        Ok(SyncResult {
            success: true,
            source_display_name: source.display_name,
            source_sync_job_id,
            index_id,
        })
    }
}

use anyhow::{Result, anyhow, bail};
use serde::Deserialize;

use crate::types::ChangedFile;

pub const CREATE_SOURCE_SYNC_JOB: &str = r#"
    mutation CreateSourceSyncJob($input: CreateSourceSyncJobInput!) {
        createSourceSyncJob(input: $input) {
            success
            sourceSyncJob {
                id
            }
        }
    }
"#;

pub const GET_SOURCE: &str = r#"
    query GetSource($sourceId: ID!) {
        source(sourceId: $sourceId) {
            displayName
            indexes {
                id
            }
        }
    }
"#;

pub const CREATE_INDEXING_JOB: &str = r#"
    mutation CreateIndexingJob($input: CreateIndexingJobInput!) {
        createIndexingJob(input: $input) {
            success
            indexingJob {
                id
            }
        }
    }
"#;

/// Builds the manifest listing the files an incremental sync should ingest.
pub fn build_manifest(commit_sha: &str, files: &[ChangedFile]) -> serde_json::Value {
    let files: Vec<serde_json::Value> = files
        .iter()
        .map(|file| {
            serde_json::json!({
                "path": file.path,
                "status": file.kind.as_str(),
                "previousPath": file.previous_path,
            })
        })
        .collect();

    serde_json::json!({
        "commitSha": commit_sha,
        "files": files,
    })
}

pub fn create_source_sync_job_request(
    source_id: &str,
    manifest: serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({
        "operationName": "CreateSourceSyncJob",
        "query": CREATE_SOURCE_SYNC_JOB,
        "variables": {
            "input": {
                "sourceId": source_id,
                "type": "INCREMENTAL",
                "manifest": manifest,
            }
        }
    })
}

pub fn get_source_request(source_id: &str) -> serde_json::Value {
    serde_json::json!({
        "operationName": "GetSource",
        "query": GET_SOURCE,
        "variables": { "sourceId": source_id }
    })
}

pub fn create_indexing_job_request(index_id: &str) -> serde_json::Value {
    serde_json::json!({
        "operationName": "CreateIndexingJob",
        "query": CREATE_INDEXING_JOB,
        "variables": {
            "input": { "indexId": index_id }
        }
    })
}

#[derive(Debug, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQLError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLError {
    pub message: String,
}

impl<T> GraphQLResponse<T> {
    /// Returns the `data` member, treating any reported error as fatal.
    pub fn into_data(self, operation: &str) -> Result<T> {
        if !self.errors.is_empty() {
            let message = self
                .errors
                .into_iter()
                .map(|error| error.message)
                .collect::<Vec<_>>()
                .join("\n");
            bail!("GraphQL operation {operation} failed: {message}");
        }
        self.data
            .ok_or_else(|| anyhow!("No data returned from GraphQL operation {operation}"))
    }
}

#[derive(Debug, Deserialize)]
pub struct IdNode {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSourceSyncJobData {
    pub create_source_sync_job: SourceSyncJobPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSyncJobPayload {
    pub success: bool,
    pub source_sync_job: Option<IdNode>,
}

#[derive(Debug, Deserialize)]
pub struct SourceData {
    pub source: Option<SourceNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceNode {
    pub display_name: String,
    // Required: a source without an `indexes` array is a malformed response.
    pub indexes: Vec<IdNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIndexingJobData {
    pub create_indexing_job: IndexingJobPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingJobPayload {
    pub success: bool,
    pub indexing_job: Option<IdNode>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChangeKind;

    #[test]
    fn unsuccessful_sync_job_parses_without_job() {
        let response: GraphQLResponse<CreateSourceSyncJobData> =
            serde_json::from_str(r#"{"data":{"createSourceSyncJob":{"success": false}}}"#).unwrap();
        let payload = response
            .into_data("CreateSourceSyncJob")
            .unwrap()
            .create_source_sync_job;
        assert!(!payload.success);
        assert!(payload.source_sync_job.is_none());
    }

    #[test]
    fn successful_sync_job_carries_id() {
        let response: GraphQLResponse<CreateSourceSyncJobData> = serde_json::from_str(
            r#"{"data":{"createSourceSyncJob":{"success":true,"sourceSyncJob":{"id":"job_1"}}}}"#,
        )
        .unwrap();
        let payload = response
            .into_data("CreateSourceSyncJob")
            .unwrap()
            .create_source_sync_job;
        assert!(payload.success);
        assert_eq!(payload.source_sync_job.unwrap().id, "job_1");
    }

    #[test]
    fn graphql_errors_are_fatal() {
        let response: GraphQLResponse<SourceData> = serde_json::from_str(
            r#"{"data":null,"errors":[{"message":"Unauthorized"},{"message":"Bad alias"}]}"#,
        )
        .unwrap();
        let err = response.into_data("GetSource").unwrap_err().to_string();
        assert!(err.contains("GetSource"));
        assert!(err.contains("Unauthorized\nBad alias"));
    }

    #[test]
    fn missing_data_is_fatal() {
        let response: GraphQLResponse<SourceData> = serde_json::from_str("{}").unwrap();
        assert!(response.into_data("GetSource").is_err());
    }

    #[test]
    fn source_without_indexes_is_malformed() {
        let parsed = serde_json::from_str::<GraphQLResponse<SourceData>>(
            r#"{"data":{"source":{"displayName":"Docs"}}}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn source_with_indexes_parses() {
        let response: GraphQLResponse<SourceData> = serde_json::from_str(
            r#"{"data":{"source":{"displayName":"Docs","indexes":[{"id":"idx_1"},{"id":"idx_2"}]}}}"#,
        )
        .unwrap();
        let source = response.into_data("GetSource").unwrap().source.unwrap();
        assert_eq!(source.display_name, "Docs");
        assert_eq!(source.indexes.len(), 2);
        assert_eq!(source.indexes[0].id, "idx_1");
    }

    #[test]
    fn manifest_lists_files_with_status() {
        let files = vec![
            ChangedFile {
                path: "docs/intro.md".to_string(),
                kind: ChangeKind::Modified,
                previous_path: None,
            },
            ChangedFile {
                path: "docs/guide.md".to_string(),
                kind: ChangeKind::Renamed,
                previous_path: Some("docs/old-guide.md".to_string()),
            },
        ];

        let manifest = build_manifest("abc123", &files);
        assert_eq!(manifest["commitSha"], "abc123");
        assert_eq!(manifest["files"][0]["path"], "docs/intro.md");
        assert_eq!(manifest["files"][0]["status"], "modified");
        assert!(manifest["files"][0]["previousPath"].is_null());
        assert_eq!(manifest["files"][1]["previousPath"], "docs/old-guide.md");
    }

    #[test]
    fn sync_job_request_is_incremental() {
        let request = create_source_sync_job_request("src_1", build_manifest("abc", &[]));
        assert_eq!(request["operationName"], "CreateSourceSyncJob");
        assert_eq!(request["variables"]["input"]["sourceId"], "src_1");
        assert_eq!(request["variables"]["input"]["type"], "INCREMENTAL");
        assert_eq!(
            request["variables"]["input"]["manifest"]["files"]
                .as_array()
                .unwrap()
                .len(),
            0
        );
    }
}

use std::time::Duration;

use reqwest::{StatusCode, header};
use serde::Serialize;
use serde_json::Value;

use super::{ApprovalApi, ApprovalApiError, ApprovalFuture, PutApprovalRequest};
use crate::domain::error::DomainError;

const PUT_APPROVAL_TARGET: &str = "CodePipeline_20150709.PutApprovalResult";
const AWS_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const ALREADY_COMPLETED_TYPE: &str = "ApprovalAlreadyCompletedException";

/// CodePipeline `PutApprovalResult` over the AWS JSON 1.1 wire protocol.
///
/// Request signing is left to the deployment (VPC endpoint or signing
/// proxy); the optional bearer token covers the proxy case.
pub struct CodePipelineClient {
    http: reqwest::Client,
    endpoint: String,
    auth_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PutApprovalResultBody<'a> {
    pipeline_name: &'a str,
    stage_name: &'a str,
    action_name: &'a str,
    token: &'a str,
    result: ApprovalResultBody<'a>,
}

#[derive(Debug, Serialize)]
struct ApprovalResultBody<'a> {
    summary: &'a str,
    status: &'a str,
}

impl CodePipelineClient {
    pub fn new(
        endpoint: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                DomainError::Unavailable(format!("failed to construct http client: {error}"))
            })?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            auth_token,
        })
    }

    async fn submit(&self, request: &PutApprovalRequest) -> Result<(), ApprovalApiError> {
        let body = PutApprovalResultBody {
            pipeline_name: &request.pipeline_name,
            stage_name: &request.stage_name,
            action_name: &request.action_name,
            token: &request.token,
            result: ApprovalResultBody {
                summary: &request.summary,
                status: request.status.as_str(),
            },
        };

        let mut builder = self
            .http
            .post(&self.endpoint)
            .header("x-amz-target", PUT_APPROVAL_TARGET)
            .header(header::CONTENT_TYPE, AWS_JSON_CONTENT_TYPE)
            .json(&body);
        if let Some(token) = self.auth_token.as_deref() {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|error| ApprovalApiError::Other(format!("pipeline request failed: {error}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status, &body))
    }
}

impl ApprovalApi for CodePipelineClient {
    fn put_approval_result<'a>(&'a self, request: &'a PutApprovalRequest) -> ApprovalFuture<'a> {
        Box::pin(self.submit(request))
    }
}

/// AWS JSON errors carry the exception name in `__type`, optionally prefixed
/// with the service namespace (`com.amazonaws...#Name`).
fn classify_failure(status: StatusCode, body: &str) -> ApprovalApiError {
    if let Ok(value) = serde_json::from_str::<Value>(body)
        && let Some(error_type) = value.get("__type").and_then(Value::as_str)
        && error_type.rsplit('#').next() == Some(ALREADY_COMPLETED_TYPE)
    {
        return ApprovalApiError::AlreadyCompleted;
    }

    ApprovalApiError::Other(format!("pipeline API returned {status}: {body}"))
}

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    application::config::RuntimeConfig,
    domain::error::DomainError,
    pipeline::{ApprovalApi, client::CodePipelineClient},
};

#[derive(Clone)]
pub struct SharedState {
    inner: Arc<InnerState>,
}

struct InnerState {
    config: RuntimeConfig,
    approvals: Arc<dyn ApprovalApi>,
    started_at: Instant,
}

impl SharedState {
    pub fn new(config: RuntimeConfig) -> Result<Self, DomainError> {
        let client = CodePipelineClient::new(
            &config.pipeline_api_url,
            config.pipeline_api_token.clone(),
            config.pipeline_timeout,
        )?;
        Ok(Self::with_approval_api(config, Arc::new(client)))
    }

    /// Build state around a caller-supplied approval client. Test seam.
    #[must_use]
    pub fn with_approval_api(config: RuntimeConfig, approvals: Arc<dyn ApprovalApi>) -> Self {
        Self {
            inner: Arc::new(InnerState {
                config,
                approvals,
                started_at: Instant::now(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn approvals(&self) -> &dyn ApprovalApi {
        self.inner.approvals.as_ref()
    }

    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.inner.started_at.elapsed()
    }
}

pub mod client;

use futures_util::future::BoxFuture;
use thiserror::Error;

/// Decision submitted to a pending manual-approval gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalStatus {
    Approved,
    Rejected,
}

impl ApprovalStatus {
    #[must_use]
    pub fn from_approve_flag(approve: bool) -> Self {
        if approve { Self::Approved } else { Self::Rejected }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

/// The relay only needs to tell "already resolved" apart from everything
/// else; detail on the latter is logged, never shown to the caller.
#[derive(Debug, Error)]
pub enum ApprovalApiError {
    #[error("approval already completed")]
    AlreadyCompleted,
    #[error("approval submission failed: {0}")]
    Other(String),
}

#[derive(Debug, Clone)]
pub struct PutApprovalRequest {
    pub pipeline_name: String,
    pub stage_name: String,
    pub action_name: String,
    pub token: String,
    pub status: ApprovalStatus,
    pub summary: String,
}

pub type ApprovalFuture<'a> = BoxFuture<'a, Result<(), ApprovalApiError>>;

/// Seam to the pipeline-control API. One attempt per call; the caller never
/// retries, since a second submission could race the gate's single-resolution
/// guarantee.
pub trait ApprovalApi: Send + Sync {
    fn put_approval_result<'a>(&'a self, request: &'a PutApprovalRequest) -> ApprovalFuture<'a>;
}

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::{
    application::state::SharedState,
    pipeline::{ApprovalApiError, ApprovalStatus, PutApprovalRequest},
};

const FALLBACK_TEXT: &str = "Unable to approve the change";
const CALLBACK_ID: &str = "wopr_game";
const ATTACHMENT_TYPE: &str = "default";
const DEFAULT_COLOR: &str = "#3AA3E3";
const COLOR_GOOD: &str = "good";
const COLOR_DANGER: &str = "danger";
const COLOR_WARNING: &str = "warning";

const INVALID_TOKEN_TEXT: &str = "This request does not include a valid verification token";
const INTERNAL_ERROR_TEXT: &str = "There was an error processing the approval";
const ALREADY_COMPLETED_TEXT: &str = "The approval has already been completed in CodePipeline";

#[derive(Debug, Deserialize)]
pub struct CallbackForm {
    payload: String,
}

#[derive(Debug, Deserialize)]
struct InboundPayload {
    token: String,
    user: SlackUser,
    original_message: OriginalMessage,
    #[serde(default)]
    actions: Vec<MessageAction>,
}

#[derive(Debug, Deserialize)]
struct SlackUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OriginalMessage {
    text: String,
    #[serde(default)]
    attachments: Vec<OriginalAttachment>,
}

#[derive(Debug, Deserialize)]
struct OriginalAttachment {
    text: String,
}

#[derive(Debug, Deserialize)]
struct MessageAction {
    value: String,
}

/// Decoded `actions[0].value`; wire names are fixed by the approval
/// requester that built the interactive message.
#[derive(Debug, Deserialize)]
struct ActionDescriptor {
    approve: bool,
    #[serde(rename = "codePipelineToken")]
    token: String,
    #[serde(rename = "codePipelineName")]
    pipeline_name: String,
    #[serde(rename = "codePipelineStage")]
    stage_name: String,
    #[serde(rename = "codePipelineAction")]
    action_name: String,
}

/// Message update that visually replaces the interactive prompt. The echoed
/// texts always match the inbound original message, whatever the outcome.
#[derive(Debug, Serialize)]
pub struct MessageUpdate {
    text: String,
    attachments: Vec<MessageAttachment>,
}

#[derive(Debug, Serialize)]
struct MessageAttachment {
    text: String,
    fallback: &'static str,
    callback_id: &'static str,
    color: &'static str,
    attachment_type: &'static str,
    fields: Vec<AttachmentField>,
}

#[derive(Debug, Serialize)]
struct AttachmentField {
    value: String,
}

#[derive(Debug, Clone)]
struct Draft {
    text: String,
    attachment_text: String,
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    InvalidToken,
    Resolved(ApprovalStatus),
    AlreadyCompleted,
    InternalError,
}

pub async fn actions_handler(
    State(state): State<SharedState>,
    form: Result<Form<CallbackForm>, FormRejection>,
) -> Response {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            warn!("approval callback form rejected: {rejection}");
            return bad_request().into_response();
        }
    };

    let payload = match serde_json::from_str::<InboundPayload>(&form.payload) {
        Ok(payload) => payload,
        Err(error) => {
            warn!("approval callback payload undecodable: {error}");
            return bad_request().into_response();
        }
    };

    match relay_callback(&state, payload).await {
        Ok((status, update)) => (status, Json(update)).into_response(),
        Err(reason) => {
            warn!("approval callback malformed: {reason}");
            bad_request().into_response()
        }
    }
}

/// Runs the per-request state machine: token gate, dispatch, classify,
/// render. `Err` is a malformed-request condition the handler maps to 400.
async fn relay_callback(
    state: &SharedState,
    payload: InboundPayload,
) -> Result<(StatusCode, MessageUpdate), String> {
    let draft = draft_from(&payload)?;

    if !token_matches(&payload.token, &state.config().verification_token) {
        return Ok(render(&draft, &Outcome::InvalidToken, &payload.user.id));
    }

    let action = payload
        .actions
        .first()
        .ok_or_else(|| "callback carries no actions".to_owned())?;
    let descriptor = serde_json::from_str::<ActionDescriptor>(&action.value)
        .map_err(|error| format!("action descriptor undecodable: {error}"))?;

    let status = ApprovalStatus::from_approve_flag(descriptor.approve);
    let request = PutApprovalRequest {
        pipeline_name: descriptor.pipeline_name,
        stage_name: descriptor.stage_name,
        action_name: descriptor.action_name,
        token: descriptor.token,
        status,
        summary: String::new(),
    };

    let outcome = match state.approvals().put_approval_result(&request).await {
        Ok(()) => {
            info!(
                "approval resolved pipeline={} stage={} action={} status={}",
                request.pipeline_name,
                request.stage_name,
                request.action_name,
                status.as_str()
            );
            Outcome::Resolved(status)
        }
        Err(ApprovalApiError::AlreadyCompleted) => Outcome::AlreadyCompleted,
        Err(ApprovalApiError::Other(detail)) => {
            error!("approval submission failed: {detail}");
            Outcome::InternalError
        }
    };

    Ok(render(&draft, &outcome, &payload.user.id))
}

fn draft_from(payload: &InboundPayload) -> Result<Draft, String> {
    let attachment = payload
        .original_message
        .attachments
        .first()
        .ok_or_else(|| "original message carries no attachments".to_owned())?;
    Ok(Draft {
        text: payload.original_message.text.clone(),
        attachment_text: attachment.text.clone(),
    })
}

fn token_matches(found: &str, expected: &str) -> bool {
    subtle::ConstantTimeEq::ct_eq(found.as_bytes(), expected.as_bytes()).into()
}

/// Pure rendering: same (draft, outcome, user) always yields the same
/// status code and body.
fn render(draft: &Draft, outcome: &Outcome, user_id: &str) -> (StatusCode, MessageUpdate) {
    let (status, color, field) = match outcome {
        Outcome::InvalidToken => (
            StatusCode::FORBIDDEN,
            COLOR_WARNING,
            INVALID_TOKEN_TEXT.to_owned(),
        ),
        Outcome::InternalError => (
            StatusCode::INTERNAL_SERVER_ERROR,
            COLOR_WARNING,
            INTERNAL_ERROR_TEXT.to_owned(),
        ),
        Outcome::AlreadyCompleted => (
            StatusCode::OK,
            DEFAULT_COLOR,
            ALREADY_COMPLETED_TEXT.to_owned(),
        ),
        Outcome::Resolved(resolution) => {
            let color = match resolution {
                ApprovalStatus::Approved => COLOR_GOOD,
                ApprovalStatus::Rejected => COLOR_DANGER,
            };
            (
                StatusCode::OK,
                color,
                format!("{} by <@{user_id}>", resolution.as_str()),
            )
        }
    };

    let update = MessageUpdate {
        text: draft.text.clone(),
        attachments: vec![MessageAttachment {
            text: draft.attachment_text.clone(),
            fallback: FALLBACK_TEXT,
            callback_id: CALLBACK_ID,
            color,
            attachment_type: ATTACHMENT_TYPE,
            fields: vec![AttachmentField { value: field }],
        }],
    };

    (status, update)
}

fn bad_request() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "ok": false,
            "error": {
                "code": "INVALID_REQUEST",
                "message": "malformed approval callback",
            }
        })),
    )
}

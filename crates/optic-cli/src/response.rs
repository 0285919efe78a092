//! Maps planner outcomes onto the `{stdout, stderr, returncode}` envelope.

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use optic_core::InvocationOutcome;
use optic_core::planner::NO_EXIT_CODE;

/// Body of every `/plan` response, success or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub stdout: String,
    pub stderr: String,
    pub returncode: i32,
}

impl PlanResponse {
    /// An envelope for a failure that produced no planner output.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: reason.into(),
            returncode: NO_EXIT_CODE,
        }
    }
}

/// An envelope paired with the HTTP status it is sent with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: PlanResponse,
}

impl Reply {
    /// A request refused before reaching the planner.
    pub fn rejected(status: StatusCode, reason: impl Into<String>) -> Self {
        Self {
            status,
            body: PlanResponse::failure(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// 200 only for a completed run, whatever the planner's exit code; every
/// infrastructure failure is 500.
pub fn build_response(outcome: InvocationOutcome) -> Reply {
    match outcome {
        InvocationOutcome::Completed {
            stdout,
            stderr,
            exit_code,
        } => Reply {
            status: StatusCode::OK,
            body: PlanResponse {
                stdout,
                stderr,
                returncode: exit_code,
            },
        },
        InvocationOutcome::ToolUnavailable { reason }
        | InvocationOutcome::ExecutionError { reason } => {
            Reply::rejected(StatusCode::INTERNAL_SERVER_ERROR, reason)
        }
        InvocationOutcome::TimedOut { timeout } => Reply::rejected(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("planner timed out after {}s", timeout.as_secs()),
        ),
    }
}

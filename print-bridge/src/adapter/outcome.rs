//! User-facing print outcome

use serde::Serialize;

use crate::error::{BridgeError, FailureKind, TransportError};
use crate::transport::AgentResponse;

const TITLE_FAILED: &str = "Printing failed";
const AGENT_UNREACHABLE_BODY: &str =
    "Could not connect to the local print agent. Make sure it is installed and running.";
const GENERIC_BODY: &str = "An unexpected error occurred while printing. Please try again.";

/// Message shown to the cashier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeMessage {
    pub title: String,
    pub body: String,
}

impl OutcomeMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Result of one print; never an error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintOutcome {
    pub successful: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AgentResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<OutcomeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
}

impl PrintOutcome {
    pub fn success(result: AgentResponse) -> Self {
        Self {
            successful: true,
            result: Some(result),
            message: None,
            kind: None,
        }
    }

    /// Failure outcome for `err`.
    ///
    /// Expected failures get a specific message; unexpected ones a generic
    /// message unless `debug` is set, which appends the raw error text.
    pub fn failure(err: &BridgeError, debug: bool) -> Self {
        Self {
            successful: false,
            result: None,
            message: Some(failure_message(err, debug)),
            kind: Some(err.kind()),
        }
    }

    pub fn from_result(result: Result<AgentResponse, BridgeError>, debug: bool) -> Self {
        match result {
            Ok(response) => Self::success(response),
            Err(err) => Self::failure(&err, debug),
        }
    }
}

fn failure_message(err: &BridgeError, debug: bool) -> OutcomeMessage {
    match err {
        BridgeError::UnsupportedFormat(detail) => OutcomeMessage::new(
            TITLE_FAILED,
            with_detail(
                "The receipt could not be converted into a printable format.".into(),
                detail,
                debug,
            ),
        ),
        BridgeError::NotConfigured(detail) => OutcomeMessage::new(
            "Printer not configured",
            format!("No usable printer is configured: {detail}."),
        ),
        BridgeError::UnsupportedByAdapter(detail) => OutcomeMessage::new(TITLE_FAILED, detail.clone()),
        BridgeError::Cancelled => OutcomeMessage::new(
            TITLE_FAILED,
            "Printing was cancelled because the print service stopped.",
        ),
        BridgeError::Transport(TransportError::NotConnected) => OutcomeMessage::new(
            TITLE_FAILED,
            AGENT_UNREACHABLE_BODY,
        ),
        BridgeError::Transport(TransportError::Timeout(ms)) => OutcomeMessage::new(
            TITLE_FAILED,
            format!("The print agent timed out after {ms} ms."),
        ),
        BridgeError::Transport(TransportError::HttpStatus { code, body }) => OutcomeMessage::new(
            TITLE_FAILED,
            with_detail(format!("The print agent answered with HTTP {code}."), body, debug),
        ),
        BridgeError::Transport(TransportError::NetworkBlocked { guidance, .. }) => {
            OutcomeMessage::new("Connection blocked", guidance.clone())
        }
        BridgeError::Transport(TransportError::Rejected(reason)) => OutcomeMessage::new(
            TITLE_FAILED,
            format!("The printer rejected the job: {reason}"),
        ),
        BridgeError::Transport(TransportError::Network(_))
        | BridgeError::Transport(TransportError::Protocol(_)) => {
            if debug {
                OutcomeMessage::new(TITLE_FAILED, err.to_string())
            } else {
                OutcomeMessage::new(TITLE_FAILED, GENERIC_BODY)
            }
        }
    }
}

fn with_detail(body: String, detail: &str, debug: bool) -> String {
    if debug {
        format!("{body}\n\n{detail}")
    } else {
        body
    }
}

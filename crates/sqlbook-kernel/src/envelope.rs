//! Result and error envelopes returned to the caller.

use std::collections::BTreeMap;

use serde::Serialize;

/// Payload key for monospace tabular text or plain messages.
pub const TEXT_PLAIN: &str = "text/plain";
/// Payload key for `<table>` markup.
pub const TEXT_HTML: &str = "text/html";
/// Payload key for the chart-spec output.
pub const CHART_SPEC: &str = "application/vnd.vegalite.v3+json";

/// A display-data bundle: MIME-type-like key to rendered payload.
pub type MimeBundle = BTreeMap<String, serde_json::Value>;

/// Build a bundle holding a single `text/plain` payload.
#[must_use]
pub fn text_bundle(message: impl Into<String>) -> MimeBundle {
    let mut bundle = MimeBundle::new();
    bundle.insert(
        TEXT_PLAIN.to_owned(),
        serde_json::Value::String(message.into()),
    );
    bundle
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// Details of a failed request: uniform error name, the message, and the
/// one-line traceback shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub ename: String,
    pub evalue: String,
    pub traceback: Vec<String>,
}

impl ErrorInfo {
    /// All failures surface under one recoverable error name.
    #[must_use]
    pub fn uniform(message: impl Into<String>) -> Self {
        let evalue = message.into();
        let traceback = vec![format!("Error: {evalue}")];
        Self {
            ename: "Error".to_owned(),
            evalue,
            traceback,
        }
    }
}

/// The reply for one processed request.
///
/// On success `outputs` carries every display bundle the request published,
/// in publication order; `payload` and `user_expressions` exist for
/// protocol compatibility and stay empty. On failure `error` is set and
/// `outputs` holds whatever was published before the failing step (magic
/// and SQL never partially commit together; a failed magic step publishes
/// nothing).
#[derive(Debug, Serialize)]
pub struct ResultEnvelope {
    pub status: Status,
    pub outputs: Vec<MimeBundle>,
    pub payload: Vec<serde_json::Value>,
    pub user_expressions: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl ResultEnvelope {
    #[must_use]
    pub fn ok(outputs: Vec<MimeBundle>) -> Self {
        Self {
            status: Status::Ok,
            outputs,
            payload: Vec::new(),
            user_expressions: serde_json::Value::Object(serde_json::Map::new()),
            error: None,
        }
    }

    #[must_use]
    pub fn error(outputs: Vec<MimeBundle>, info: ErrorInfo) -> Self {
        Self {
            status: Status::Error,
            outputs,
            payload: Vec::new(),
            user_expressions: serde_json::Value::Object(serde_json::Map::new()),
            error: Some(info),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// The first `text/plain` payload among the outputs, if any.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.outputs
            .iter()
            .find_map(|bundle| bundle.get(TEXT_PLAIN))
            .and_then(serde_json::Value::as_str)
    }
}

//! Normalised server reply and the wire-shape tolerance rules.
//!
//! Deployed interpretation servers answer in more than one JSON shape.  The
//! two common ones are the flat shape `{"response": …, "error"?, "redirect"?}`
//! and the flagged shape `{"success": …, "text"?, "error"?, "redirect"?}`;
//! some builds even mix them (`{"response": …, "success": true}`).  This
//! module folds all of them into one [`ServerReply`] so the controller never
//! sees wire details.

use serde_json::Value;

use super::client::ServiceError;

// ---------------------------------------------------------------------------
// ServerReply
// ---------------------------------------------------------------------------

/// A server reply after shape normalisation.
///
/// Exactly one of two cases:
/// * success — `error_message` is `None`, `text` holds the reply (possibly
///   empty), `follow_up_url` optionally names a page to open;
/// * application error — `error_message` is `Some`, `text` is empty and
///   `follow_up_url` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerReply {
    /// Text to render on the reply surface.
    pub text: String,
    /// Server-reported error detail.  Only logged; the UI shows a fixed
    /// apology instead.
    pub error_message: Option<String>,
    /// URL to open after the reply has been rendered.
    pub follow_up_url: Option<String>,
}

impl ServerReply {
    /// `true` when the server reported an application-level failure.
    pub fn is_error(&self) -> bool {
        self.error_message.is_some()
    }

    /// Fold any known wire shape into a [`ServerReply`].
    ///
    /// Rules, in order:
    /// * a boolean `success` key is authoritative when present —
    ///   `false` is an error (detail from `error` if any), `true` is a
    ///   success whose text comes from `text`, falling back to `response`;
    /// * without `success`, a non-empty `error` string marks an error;
    /// * otherwise the reply is a success whose text comes from `response`,
    ///   falling back to `text`;
    /// * `error` and `redirect` count only when they are non-empty strings;
    /// * error replies never carry a follow-up URL;
    /// * anything that is not a JSON object is a parse failure.
    pub fn from_wire(value: &Value) -> Result<Self, ServiceError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ServiceError::Parse(format!("expected a JSON object, got: {value}")))?;

        let text = obj.get("text").and_then(Value::as_str);
        let response = obj.get("response").and_then(Value::as_str);
        let error = obj
            .get("error")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());
        let redirect = obj
            .get("redirect")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());

        let reply = match obj.get("success").and_then(Value::as_bool) {
            Some(false) => Self {
                text: String::new(),
                error_message: Some(
                    error.map(str::to_string).unwrap_or_else(|| "unspecified error".into()),
                ),
                follow_up_url: None,
            },
            Some(true) => Self {
                text: text.or(response).unwrap_or_default().to_string(),
                error_message: None,
                follow_up_url: redirect.map(str::to_string),
            },
            None => match error {
                Some(detail) => Self {
                    text: String::new(),
                    error_message: Some(detail.to_string()),
                    follow_up_url: None,
                },
                None => Self {
                    text: response.or(text).unwrap_or_default().to_string(),
                    error_message: None,
                    follow_up_url: redirect.map(str::to_string),
                },
            },
        };

        Ok(reply)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Reserved JSON-RPC error codes used to signal policy outcomes.
//!
//! Every error the gateway synthesizes carries [`STAMP_KEY`]` = true` in its
//! `data` payload. A backend error that reuses one of these codes or
//! messages is either a bug or a forgery attempt; the gateway rewrites it to
//! [`RESERVED_MISUSE_CODE`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;

use crate::decision::Decision;

/// Policy denied the call and the turn must stop.
pub const DENIED_ABORT_CODE: i64 = -32950;
/// Message for [`DENIED_ABORT_CODE`].
pub const DENIED_ABORT_MSG: &str = "policy_denied";

/// Policy denied the call; the turn may continue.
pub const DENIED_CONTINUE_CODE: i64 = -32951;
/// Message for [`DENIED_CONTINUE_CODE`].
pub const DENIED_CONTINUE_MSG: &str = "policy_denied_continue";

/// A backend produced an error that collides with a reserved code or message.
pub const RESERVED_MISUSE_CODE: i64 = -32952;
/// Message for [`RESERVED_MISUSE_CODE`].
pub const RESERVED_MISUSE_MSG: &str = "policy_backend_reserved_misuse";

/// The policy evaluator failed while deciding a call.
pub const EVALUATOR_ERROR_CODE: i64 = -32953;
/// Message for [`EVALUATOR_ERROR_CODE`].
pub const EVALUATOR_ERROR_MSG: &str = "policy_evaluator_error";

/// Key in `data` marking an error as produced by the gateway itself.
pub const STAMP_KEY: &str = "tollgate_policy_gateway";

/// All reserved codes.
pub const RESERVED_CODES: [i64; 4] = [
    DENIED_ABORT_CODE,
    DENIED_CONTINUE_CODE,
    RESERVED_MISUSE_CODE,
    EVALUATOR_ERROR_CODE,
];

/// All reserved messages.
pub const RESERVED_MESSAGES: [&str; 4] = [
    DENIED_ABORT_MSG,
    DENIED_CONTINUE_MSG,
    RESERVED_MISUSE_MSG,
    EVALUATOR_ERROR_MSG,
];

/// Messages scanned for inside opaque (non JSON-RPC) backend failures.
const OPAQUE_SCAN_MESSAGES: [&str; 3] = [DENIED_ABORT_MSG, DENIED_CONTINUE_MSG, EVALUATOR_ERROR_MSG];

/// Whether `code` is one of the reserved codes.
#[must_use]
pub fn is_reserved_code(code: i64) -> bool {
    RESERVED_CODES.contains(&code)
}

/// Whether `message` is exactly one of the reserved messages.
#[must_use]
pub fn is_reserved_message(message: &str) -> bool {
    RESERVED_MESSAGES.contains(&message)
}

/// Whether free-form error text contains a reserved policy message.
#[must_use]
pub fn mentions_reserved_message(text: &str) -> bool {
    OPAQUE_SCAN_MESSAGES.iter().any(|m| text.contains(m))
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    /// Error code.
    pub code: i64,
    /// Short error message.
    pub message: String,
    /// Structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorData {
    /// Create an error object.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    /// Denial for `decision` on tool `name`.
    ///
    /// `decision` must be [`Decision::DenyAbort`] or [`Decision::DenyContinue`];
    /// anything else is treated as an abort.
    #[must_use]
    pub fn policy_denied(decision: Decision, name: &str, reason: Option<&str>) -> Self {
        let (code, message) = match decision {
            Decision::DenyContinue => (DENIED_CONTINUE_CODE, DENIED_CONTINUE_MSG),
            Decision::DenyAbort | Decision::Allow | Decision::Ask => {
                (DENIED_ABORT_CODE, DENIED_ABORT_MSG)
            },
        };
        Self::stamped(
            code,
            message,
            json!({
                "decision": decision.as_str(),
                "name": name,
                "reason": reason,
            }),
        )
    }

    /// The evaluator failed deciding tool `name`.
    #[must_use]
    pub fn evaluator_error(name: &str, reason: &str) -> Self {
        Self::stamped(
            EVALUATOR_ERROR_CODE,
            EVALUATOR_ERROR_MSG,
            json!({ "name": name, "reason": reason }),
        )
    }

    /// A backend for tool `name` returned an error colliding with a reserved
    /// code or message. `backend_code` is `None` when the backend error had
    /// no code (rendered as `"unknown"`).
    #[must_use]
    pub fn reserved_misuse(name: &str, backend_code: Option<i64>) -> Self {
        let backend_code = backend_code.map_or_else(|| json!("unknown"), |c| json!(c));
        Self::stamped(
            RESERVED_MISUSE_CODE,
            RESERVED_MISUSE_MSG,
            json!({ "name": name, "backend_code": backend_code }),
        )
    }

    fn stamped(code: i64, message: &str, payload: Value) -> Self {
        let mut data = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        data.insert(STAMP_KEY.to_owned(), Value::Bool(true));
        Self::new(code, message, Some(Value::Object(data)))
    }

    /// Whether `data` carries the gateway stamp.
    #[must_use]
    pub fn is_stamped(&self) -> bool {
        self.data
            .as_ref()
            .and_then(|d| d.get(STAMP_KEY))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Whether this error, seen coming back from a backend, collides with the
    /// gateway's reserved signalling.
    ///
    /// A stamp on a backend error is itself a collision: only the gateway may
    /// stamp.
    #[must_use]
    pub fn collides_with_reserved(&self) -> bool {
        self.is_stamped() || is_reserved_code(self.code) || is_reserved_message(&self.message)
    }

    /// Look up a string field in `data`.
    #[must_use]
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.as_ref()?.get(key)?.as_str()
    }
}

impl fmt::Display for ErrorData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

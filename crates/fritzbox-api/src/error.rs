use thiserror::Error;

/// Top-level error type for the `fritzbox-api` crate.
///
/// Covers every failure mode of the client: URL construction, transport,
/// authentication and session lifetime, device preconditions, and decoding
/// of gateway responses. Nothing in this crate retries; every error goes
/// straight back to the caller.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The gateway answered the login with the unauthenticated sid.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The session sat idle longer than the gateway's inactivity window.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Http {
        status: reqwest::StatusCode,
        url: String,
    },

    /// A request path or query could not be resolved against the base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup failed while building the HTTP client.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Devices ─────────────────────────────────────────────────────
    #[error("Device {ain:?} is not connected")]
    DeviceNotConnected { ain: String },

    /// Unlocking is only possible through the gateway's own web UI.
    #[error("Device {ain:?} is locked; unlock it via the FRITZ!Box UI")]
    DeviceLocked { ain: String },

    #[error("Device {ain:?} could not be found")]
    DeviceNotFound { ain: String },

    /// The command does not apply to this device kind or capability set.
    #[error("Device {ain:?} does not support {operation}")]
    UnsupportedOperation {
        ain: String,
        operation: &'static str,
    },

    /// Thermostat is switched off administratively (setpoint 253/254).
    #[error("Device {ain:?} is off")]
    DeviceOff { ain: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The gateway echoed a value different from the one commanded.
    #[error("Inconsistent response: expected {expected:?}, got {actual:?}")]
    InconsistentResponse { expected: String, actual: String },

    // ── Data ────────────────────────────────────────────────────────
    /// Response body could not be decoded, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if re-authenticating might resolve this error.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::InvalidCredentials | Self::SessionExpired)
    }

    /// Returns `true` for network failures and non-2xx statuses.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http { .. })
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::DeviceNotFound { .. } => true,
            Self::Http { status, .. } => *status == reqwest::StatusCode::NOT_FOUND,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    pub(crate) fn deserialization(message: impl std::fmt::Display, body: &str) -> Self {
        let preview = body
            .char_indices()
            .nth(200)
            .map_or(body, |(idx, _)| &body[..idx]);
        Self::Deserialization {
            message: format!("{message} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    }
}

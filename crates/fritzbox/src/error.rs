//! CLI error types with miette diagnostics.
//!
//! Maps `fritzbox_api::Error` variants into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use fritzbox_api::Error as ApiError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to FRITZ!Box at {url}")]
    #[diagnostic(
        code(fritzbox::connection_failed),
        help(
            "Check that the gateway is reachable and the URL is right.\n\
             URL: {url}\n\
             Set it with --url or FRITZBOX_URL."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS setup failed: {reason}")]
    #[diagnostic(
        code(fritzbox::tls_error),
        help(
            "The gateway uses a self-signed certificate by default.\n\
             Use --insecure (-k) to accept it, or set ca_cert in the config file."
        )
    )]
    Tls { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Login rejected by the FRITZ!Box")]
    #[diagnostic(
        code(fritzbox::auth_failed),
        help(
            "Verify user name and password.\n\
             The gateway blocks logins for a while after repeated failures."
        )
    )]
    AuthFailed,

    #[error("Session expired")]
    #[diagnostic(code(fritzbox::session_expired), help("Run the command again to log in anew."))]
    SessionExpired,

    #[error("No password configured")]
    #[diagnostic(
        code(fritzbox::no_credentials),
        help(
            "Pass --password, set FRITZBOX_PASSWORD, or add `password` to\n\
             {path}"
        )
    )]
    NoCredentials { path: String },

    // ── Devices ──────────────────────────────────────────────────────
    #[error("Device '{ain}' not found")]
    #[diagnostic(
        code(fritzbox::not_found),
        help("Run: fritzbox devices list to see available devices")
    )]
    NotFound { ain: String },

    #[error("Device '{ain}' does not support {operation}")]
    #[diagnostic(code(fritzbox::unsupported))]
    Unsupported { ain: String, operation: String },

    #[error("Device '{ain}' is {state}")]
    #[diagnostic(code(fritzbox::device_unavailable), help("{hint}"))]
    DeviceUnavailable {
        ain: String,
        state: &'static str,
        hint: &'static str,
    },

    // ── Gateway ──────────────────────────────────────────────────────
    #[error("Unexpected answer from the FRITZ!Box: {message}")]
    #[diagnostic(code(fritzbox::api_error))]
    Api { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fritzbox::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(fritzbox::config))]
    Config(Box<figment::Error>),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Tls { .. } => exit_code::CONNECTION,
            Self::AuthFailed | Self::SessionExpired | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::Validation { .. } => exit_code::USAGE,
            Self::DeviceUnavailable { .. } | Self::Api { .. } | Self::Config(_) | Self::Io(_) => {
                exit_code::GENERAL
            }
        }
    }
}

// ── fritzbox_api::Error → CliError mapping ───────────────────────────

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::InvalidCredentials => CliError::AuthFailed,
            ApiError::SessionExpired => CliError::SessionExpired,

            ApiError::Transport(e) => CliError::ConnectionFailed {
                url: e.url().map(ToString::to_string).unwrap_or_default(),
                source: Box::new(e),
            },

            ApiError::Http { status, url } => CliError::Api {
                message: format!("HTTP {status} from {url}"),
            },

            ApiError::InvalidUrl(e) => CliError::Validation {
                field: "url".into(),
                reason: e.to_string(),
            },

            ApiError::Tls(reason) => CliError::Tls { reason },

            ApiError::DeviceNotFound { ain } => CliError::NotFound { ain },

            ApiError::UnsupportedOperation { ain, operation } => CliError::Unsupported {
                ain,
                operation: operation.into(),
            },

            ApiError::DeviceNotConnected { ain } => CliError::DeviceUnavailable {
                ain,
                state: "not connected",
                hint: "Check that the device is powered and in DECT range.",
            },

            ApiError::DeviceLocked { ain } => CliError::DeviceUnavailable {
                ain,
                state: "locked",
                hint: "Unlock the device in the FRITZ!Box web interface.",
            },

            ApiError::DeviceOff { ain } => CliError::DeviceUnavailable {
                ain,
                state: "switched off",
                hint: "Run: fritzbox devices on <ain> to switch it back on.",
            },

            ApiError::InvalidArgument(reason) => CliError::Validation {
                field: "argument".into(),
                reason,
            },

            ApiError::InconsistentResponse { expected, actual } => CliError::Api {
                message: format!("expected {expected:?}, got {actual:?}"),
            },

            ApiError::Deserialization { message, .. } => CliError::Api { message },
        }
    }
}

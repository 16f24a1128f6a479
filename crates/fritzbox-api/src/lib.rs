// fritzbox-api: Async Rust client for the FRITZ!Box home automation interface
//
// Challenge-response login with sliding session expiry, sid-carrying
// requests, and typed switch commands for sockets and thermostats.

pub mod auth;
pub mod client;
pub mod devices;
pub mod error;
pub mod models;
pub mod session;
pub mod transport;

pub use auth::compute_response;
pub use client::{Client, DEFAULT_BASE_URL};
pub use error::Error;
pub use models::{Capabilities, Capability, Device, clean_ain};
pub use session::{DEFAULT_SID, Right, SESSION_TIMEOUT, Session, SessionState};
pub use transport::{TlsMode, TransportConfig};

// Re-exported so callers can build requests without depending on reqwest.
pub use reqwest::Method;

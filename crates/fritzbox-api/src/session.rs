// Session state for the FRITZ!Box login protocol
//
// A session walks Unauthenticated -> Challenged -> Authenticated and falls
// back to Unauthenticated on close or on detected idle expiry. The network
// half of the lifecycle lives in `auth.rs`; this module only holds state.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::Error;

/// The sid the gateway uses for "no session". Also used to log out.
pub const DEFAULT_SID: &str = "0000000000000000";

/// Inactivity window after which the gateway drops a session.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(10 * 60);

fn timeout_delta() -> TimeDelta {
    TimeDelta::from_std(SESSION_TIMEOUT).expect("session timeout fits in TimeDelta")
}

/// Where a session currently stands in the login protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    /// A challenge was retrieved but no valid sid issued yet.
    Challenged,
    Authenticated,
}

/// A named permission granted to the session (e.g. `Dial`, `HomeAuto`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Right {
    pub name: String,
    pub access: u8,
}

/// Authentication state of one client.
#[derive(Debug, Clone)]
pub struct Session {
    sid: String,
    challenge: String,
    block_time: Duration,
    rights: Vec<Right>,
    /// `None` until the first refresh; distinguishes "never used" from "idle".
    expires: Option<DateTime<Utc>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            sid: DEFAULT_SID.to_owned(),
            challenge: String::new(),
            block_time: Duration::ZERO,
            rights: Vec::new(),
            expires: None,
        }
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    /// How long the gateway asks us to wait before the next login attempt.
    pub fn block_time(&self) -> Duration {
        self.block_time
    }

    pub fn rights(&self) -> &[Right] {
        &self.rights
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    pub fn state(&self) -> SessionState {
        if self.sid != DEFAULT_SID {
            SessionState::Authenticated
        } else if self.challenge.is_empty() {
            SessionState::Unauthenticated
        } else {
            SessionState::Challenged
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Drop the sid. Idempotent.
    ///
    /// The expiry is cleared too, so the next refresh treats the session
    /// as fresh instead of reporting the old idle timeout forever.
    pub fn close(&mut self) {
        self.sid = DEFAULT_SID.to_owned();
        self.expires = None;
    }

    /// True once the current time reaches the stored expiry.
    ///
    /// A session that was never refreshed has no expiry and counts as
    /// expired here; [`refresh`](Self::refresh) tells the two apart.
    pub fn is_expired(&self) -> bool {
        self.expires.is_none_or(|expires| Utc::now() >= expires)
    }

    /// Slide the expiry forward, or fail if the session already went idle.
    ///
    /// Called before every request. An expired session is closed and
    /// reported as [`Error::SessionExpired`] rather than silently revived.
    pub fn refresh(&mut self) -> Result<(), Error> {
        if self.expires.is_some() && self.is_expired() {
            debug!("session idle past timeout, closing");
            self.close();
            return Err(Error::SessionExpired);
        }
        self.touch();
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn set_expires(&mut self, expires: Option<DateTime<Utc>>) {
        self.expires = expires;
    }

    pub(crate) fn touch(&mut self) {
        self.expires = Some(Utc::now() + timeout_delta());
    }

    /// Merge a decoded `SessionInfo` answer. Absent elements keep their value.
    pub(crate) fn apply(&mut self, info: SessionInfo) {
        if let Some(sid) = info.sid {
            self.sid = sid;
        }
        if let Some(challenge) = info.challenge {
            self.challenge = challenge;
        }
        if let Some(block_time) = info.block_time {
            self.block_time = Duration::from_secs(block_time);
        }
        if let Some(rights) = info.rights {
            if rights.names.len() != rights.access.len() {
                debug!(
                    names = rights.names.len(),
                    access = rights.access.len(),
                    "unbalanced Rights section, extra entries ignored"
                );
            }
            self.rights = rights
                .names
                .into_iter()
                .zip(rights.access)
                .map(|(name, access)| Right { name, access })
                .collect();
        }
    }
}

// ── Wire format ─────────────────────────────────────────────────────

/// `login_sid.lua` answer:
///
/// ```xml
/// <SessionInfo>
///   <SID>0000000000000000</SID>
///   <Challenge>1234567z</Challenge>
///   <BlockTime>0</BlockTime>
///   <Rights><Name>HomeAuto</Name><Access>2</Access></Rights>
/// </SessionInfo>
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(rename = "SessionInfo")]
pub(crate) struct SessionInfo {
    #[serde(rename = "SID", default)]
    pub sid: Option<String>,
    #[serde(rename = "Challenge", default)]
    pub challenge: Option<String>,
    #[serde(rename = "BlockTime", default)]
    pub block_time: Option<u64>,
    #[serde(rename = "Rights", default)]
    pub rights: Option<RightsInfo>,
}

/// `Name`/`Access` come as alternating siblings, not as nested pairs.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RightsInfo {
    #[serde(rename = "Name", default)]
    pub names: Vec<String>,
    #[serde(rename = "Access", default)]
    pub access: Vec<u8>,
}

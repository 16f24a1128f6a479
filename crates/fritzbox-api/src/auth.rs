// FRITZ!Box login: challenge-response proof and session login flow
//
// The gateway hands out a challenge on `GET login_sid.lua`; the client
// proves knowledge of the password by hashing `<challenge>-<password>`
// as UTF-16LE with MD5 and posting the result back with the username.

use md5::{Digest, Md5};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::client::Client;
use crate::error::Error;
use crate::session::{Session, SessionInfo};

/// Login endpoint, relative to the base URL.
pub const LOGIN_PATH: &str = "login_sid.lua";

/// Replacement for UTF-16 code units the gateway's legacy encoding can't hold.
const SUBSTITUTE: u16 = 0x002e;

/// Compute the login response for `challenge` and `secret`.
///
/// The combined text is hashed as little-endian UTF-16 code units, with
/// every unit above 255 replaced by `'.'` as AVM's technical note requires.
/// The result has the form `<challenge>-<md5 hex>`.
pub fn compute_response(challenge: &str, secret: &str) -> String {
    let mut hasher = Md5::new();
    for unit in format!("{challenge}-{secret}").encode_utf16() {
        let unit = if unit > 255 { SUBSTITUTE } else { unit };
        hasher.update(unit.to_le_bytes());
    }
    format!("{challenge}-{}", hex::encode(hasher.finalize()))
}

impl Client {
    /// Log in with username and password.
    ///
    /// Creates the session on first use (or drops the current sid),
    /// fetches a fresh challenge, and submits the response. The username is sent along but the gateway
    /// only validates the proof.
    pub async fn authenticate(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        let _login = self.login_lock.lock().await;
        // A new login always replaces the sid, even one that has idled out.
        self.session_guard().get_or_insert_with(Session::new).close();

        self.open_session().await?;
        self.login(username, password).await
    }

    /// Retrieve a challenge (and the current sid) without credentials.
    pub async fn open_session(&self) -> Result<(), Error> {
        let request = self.build_request(Method::GET, LOGIN_PATH, None)?;
        let info: Option<SessionInfo> = self.execute_decoded(request).await?;

        let mut guard = self.session_guard();
        let session = guard.get_or_insert_with(Session::new);
        if let Some(info) = info {
            session.apply(info);
        }
        debug!(state = ?session.state(), "session opened");
        Ok(())
    }

    /// Submit the challenge response for the current challenge.
    ///
    /// Fails with [`Error::InvalidCredentials`] when the gateway answers
    /// with the all-zero sid; the session then stays unauthenticated.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        let challenge = self
            .session_guard()
            .as_ref()
            .map(|s| s.challenge().to_owned())
            .unwrap_or_default();
        let response = compute_response(&challenge, password.expose_secret());

        let form = [("username", username), ("response", response.as_str())];
        let request = self.build_request(Method::POST, LOGIN_PATH, Some(&form))?;
        let info: Option<SessionInfo> = self.execute_decoded(request).await?;

        let mut guard = self.session_guard();
        let session = guard.get_or_insert_with(Session::new);
        if let Some(info) = info {
            session.apply(info);
        }

        if !session.is_authenticated() {
            warn!(username, block_time = ?session.block_time(), "login rejected");
            return Err(Error::InvalidCredentials);
        }
        session.touch();
        debug!(username, "login successful");
        Ok(())
    }
}

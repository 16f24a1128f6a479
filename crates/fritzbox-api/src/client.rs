// FRITZ!Box HTTP client
//
// Wraps `reqwest::Client` with sid injection, session refresh before every
// request, status mapping, and content-type driven body decoding. Login
// flows live in `auth.rs`, device commands in `devices.rs`, both as
// inherent methods on `Client`.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Request};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::session::Session;
use crate::transport::TransportConfig;

/// Where the gateway answers on a home network.
pub const DEFAULT_BASE_URL: &str = "http://fritz.box/";

/// Async client for one FRITZ!Box.
///
/// Holds at most one session. The session is created lazily by
/// [`authenticate`](Self::authenticate); until then requests go out
/// without a sid. `Client` is `Send + Sync` and can be shared behind an
/// `Arc`; session state is guarded by a mutex that is never held across
/// an await point.
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    session: Mutex<Option<Session>>,
    /// Serializes whole login flows so challenges can't interleave.
    pub(crate) login_lock: tokio::sync::Mutex<()>,
}

impl Client {
    /// Create a client for `base_url` from a `TransportConfig`.
    ///
    /// `base_url` should end with a slash; relative paths are resolved
    /// against it.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// Use this when the caller manages TLS or proxies itself.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            session: Mutex::new(None),
            login_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Client for `http://fritz.box/` with default transport settings.
    pub fn local() -> Result<Self, Error> {
        let base_url = Url::parse(DEFAULT_BASE_URL)?;
        Self::new(base_url, &TransportConfig::default())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── Session access ───────────────────────────────────────────────

    pub(crate) fn session_guard(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().expect("session lock poisoned")
    }

    /// Snapshot of the current session, if one was ever created.
    pub fn session(&self) -> Option<Session> {
        self.session_guard().clone()
    }

    /// The sid attached to requests, if a session exists.
    pub fn session_id(&self) -> Option<String> {
        self.session_guard().as_ref().map(|s| s.sid().to_owned())
    }

    /// Close the current session locally. No-op without a session.
    pub fn close(&self) {
        if let Some(session) = self.session_guard().as_mut() {
            debug!("closing session");
            session.close();
        }
    }

    // ── Request building ─────────────────────────────────────────────

    /// Build a request for `path`, resolved against the base URL.
    ///
    /// With a session present, `sid=<token>` is set on the query (before
    /// login that is the all-zero sid, which the gateway ignores). A `form`
    /// becomes an `application/x-www-form-urlencoded` body.
    pub fn build_request(
        &self,
        method: Method,
        path: &str,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Request, Error> {
        let mut url = self.base_url.join(path)?;

        if let Some(sid) = self.session_id() {
            let pairs: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(k, _)| k != "sid")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            url.query_pairs_mut()
                .clear()
                .extend_pairs(pairs)
                .append_pair("sid", &sid);
        }

        let mut builder = self.http.request(method, url);
        if let Some(form) = form {
            builder = builder.form(form);
        }
        Ok(builder.build()?)
    }

    // ── Request execution ────────────────────────────────────────────

    /// Send a request and discard the body.
    pub async fn execute(&self, request: Request) -> Result<(), Error> {
        self.send(request).await?;
        Ok(())
    }

    /// Send a request and return the body verbatim.
    ///
    /// Used for the plain-text answers of switch commands.
    pub async fn execute_text(&self, request: Request) -> Result<String, Error> {
        let resp = self.send(request).await?;
        Ok(resp.text().await?)
    }

    /// Send a request and decode the body according to its content type.
    ///
    /// Returns `Ok(None)` when the content type is neither XML nor JSON;
    /// see [`decode_body`].
    pub async fn execute_decoded<T: DeserializeOwned>(
        &self,
        request: Request,
    ) -> Result<Option<T>, Error> {
        let resp = self.send(request).await?;
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        let body = resp.text().await?;
        decode_body(&content_type, &body)
    }

    /// Refresh the session, send, and map non-2xx statuses to errors.
    ///
    /// A failed refresh aborts before anything goes on the wire.
    async fn send(&self, request: Request) -> Result<reqwest::Response, Error> {
        self.refresh_session()?;

        // The query carries the sid; only the path is logged.
        debug!("{} {}", request.method(), request.url().path());

        let resp = self.http.execute(request).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Http {
                status,
                url: resp.url().path().to_owned(),
            });
        }
        trace!(%status, "response received");
        Ok(resp)
    }

    fn refresh_session(&self) -> Result<(), Error> {
        match self.session_guard().as_mut() {
            Some(session) => session.refresh(),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.session_id() {
            Some(sid) => f.write_str(&sid),
            None => f.write_str("<no session>"),
        }
    }
}

/// Decode a response body by its declared content type.
///
/// `text/xml` goes through quick-xml, `application/json` through serde_json.
/// Any other content type leaves the target unpopulated and is *not* an
/// error; callers that need a value must treat `None` themselves.
pub fn decode_body<T: DeserializeOwned>(content_type: &str, body: &str) -> Result<Option<T>, Error> {
    if content_type.contains("text/xml") {
        return quick_xml::de::from_str(body)
            .map(Some)
            .map_err(|e| Error::deserialization(e, body));
    }
    if content_type.contains("application/json") {
        return serde_json::from_str(body)
            .map(Some)
            .map_err(|e| Error::deserialization(e, body));
    }
    trace!(content_type, "unrecognized content type, body not decoded");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Foo {
        #[serde(rename = "A")]
        a: String,
    }

    fn local_client() -> Client {
        Client::with_client(
            reqwest::Client::new(),
            Url::parse(DEFAULT_BASE_URL).expect("valid default url"),
        )
    }

    fn authenticated(client: &Client, sid: &str) {
        let mut session = Session::new();
        session.apply(crate::session::SessionInfo {
            sid: Some(sid.into()),
            ..Default::default()
        });
        *client.session_guard() = Some(session);
    }

    #[test]
    fn request_carries_sid_and_form_body() {
        let client = local_client();
        authenticated(&client, "abc");

        let req = client
            .build_request(Method::GET, "/test", Some(&[("test", "test")]))
            .expect("request builds");

        assert_eq!(req.url().as_str(), "http://fritz.box/test?sid=abc");
        let body = req.body().and_then(reqwest::Body::as_bytes);
        assert_eq!(body, Some(&b"test=test"[..]));
        assert_eq!(
            req.headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn request_without_session_has_no_sid() {
        let client = local_client();
        let req = client
            .build_request(Method::GET, "login_sid.lua", None)
            .expect("request builds");
        assert_eq!(req.url().as_str(), "http://fritz.box/login_sid.lua");
        assert!(req.body().is_none());
    }

    #[test]
    fn sid_replaces_existing_query_value() {
        let client = local_client();
        authenticated(&client, "abc");
        let req = client
            .build_request(Method::GET, "/x?switchcmd=foo&sid=old", None)
            .expect("request builds");
        assert_eq!(req.url().as_str(), "http://fritz.box/x?switchcmd=foo&sid=abc");
    }

    #[test]
    fn unresolvable_path_is_invalid_url() {
        let client = local_client();
        let result = client.build_request(Method::GET, "http://[bad", None);
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn decode_xml_and_json() {
        let xml: Option<Foo> = decode_body("text/xml", "<foo><A>a</A></foo>").expect("xml");
        assert_eq!(xml, Some(Foo { a: "a".into() }));

        let json: Option<Foo> =
            decode_body("application/json; charset=utf-8;", r#"{"A":"a"}"#).expect("json");
        assert_eq!(json, Some(Foo { a: "a".into() }));
    }

    #[test]
    fn decode_unknown_content_type_is_noop() {
        let out: Option<Foo> = decode_body("text/plain", "<foo><A>a</A></foo>").expect("no error");
        assert_eq!(out, None);
    }

    #[test]
    fn decode_malformed_body_fails() {
        let result: Result<Option<Foo>, _> = decode_body("application/json", "{not json");
        assert!(matches!(result, Err(Error::Deserialization { .. })));
    }

    #[tokio::test]
    async fn expired_session_aborts_before_sending() {
        use wiremock::matchers::any;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = Client::with_client(
            reqwest::Client::new(),
            Url::parse(&server.uri()).expect("mock server url"),
        );
        authenticated(&client, "abc");
        client
            .session_guard()
            .as_mut()
            .expect("session present")
            .set_expires(Some(chrono::Utc::now() - chrono::TimeDelta::seconds(5)));

        let request = client
            .build_request(Method::GET, "/", None)
            .expect("request builds");
        let result = client.execute(request).await;

        assert!(matches!(result, Err(Error::SessionExpired)));
        assert_eq!(client.session_id().as_deref(), Some(crate::session::DEFAULT_SID));
    }

    #[tokio::test]
    async fn login_after_idle_timeout_succeeds_first_time() {
        use wiremock::matchers::path;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(path("/login_sid.lua"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "<SessionInfo><SID>ff88e4d39354992f</SID><Challenge>1234567z</Challenge>\
                 <BlockTime>0</BlockTime><Rights/></SessionInfo>",
                "text/xml",
            ))
            .mount(&server)
            .await;

        let client = Client::with_client(
            reqwest::Client::new(),
            Url::parse(&format!("{}/", server.uri())).expect("mock server url"),
        );
        let password = secrecy::SecretString::from("äbc".to_owned());
        client
            .authenticate("username", &password)
            .await
            .expect("first login");

        client
            .session_guard()
            .as_mut()
            .expect("session present")
            .set_expires(Some(chrono::Utc::now() - chrono::TimeDelta::seconds(5)));

        client
            .authenticate("username", &password)
            .await
            .expect("login after idle timeout");
        let session = client.session().expect("session present");
        assert_eq!(session.sid(), "ff88e4d39354992f");
        assert!(!session.is_expired());
    }

    #[test]
    fn client_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Client>();
    }

    #[test]
    fn close_without_session_is_noop() {
        let client = local_client();
        client.close();
        assert!(client.session().is_none());
        assert_eq!(client.to_string(), "<no session>");
    }

    #[test]
    fn close_resets_sid() {
        let client = local_client();
        authenticated(&client, "abc");
        assert_eq!(client.to_string(), "abc");
        client.close();
        assert_eq!(client.session_id().as_deref(), Some(crate::session::DEFAULT_SID));
    }
}

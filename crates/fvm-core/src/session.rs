//! Portal session
//!
//! A [`PortalSession`] is one browser-like conversation with the customer
//! portal: it keeps the cookie jar between the priming request, the login
//! handshake and the data calls. Sessions are opened per logical operation
//! and closed afterwards; they are never shared between operations.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{Value, json};
use tracing::{debug, error, info};

use crate::config::PortalConfig;
use crate::models::Credentials;
use crate::token::{TOKEN_FIELD, extract_token, login_succeeded};
use crate::{Error, Result};

const LOGIN_PAGE_PATH: &str = "/Fiok/Bejelentkezes?ReturnUrl=/";
const LOGIN_POST_PATH: &str = "/Fiok/Bejelentkezes?ReturnUrl=%2F";
const LOCATIONS_PATH: &str = "/Meroallas/GetDiktLeolvIdoszakFogyHelyek";
const READING_PAGE_PATH: &str = "/Meroallas/LeolvasasiDiktalasiIdoszak";
const READING_WINDOWS_PATH: &str = "/Meroallas/GetDiktalasiLeolvasasiIdoszakLisa";

const XHR_HEADER: &str = "X-Requested-With";
const XHR_VALUE: &str = "XMLHttpRequest";
const VERIFICATION_TOKEN_HEADER: &str = "VerificationToken";
const JSON_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";
const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Operations the controller needs from a portal conversation
#[async_trait]
pub trait PortalApi: Send + Sync {
    /// Load the portal root page to establish session cookies
    async fn fetch_root_page(&self) -> Result<Vec<u8>>;

    /// Run the login handshake; `Ok(false)` means rejected credentials
    async fn login(&self, credentials: &Credentials) -> Result<bool>;

    /// Raw consumption locations and meter serial numbers
    async fn fetch_locations_and_meters(&self) -> Result<Value>;

    /// Raw dictation and reading periods for one meter
    async fn fetch_reading_windows(&self, location_id: &str, meter_serial: &str) -> Result<Value>;

    /// Release the connection. Returns `true` only for the call that released it.
    fn close(&mut self) -> bool;
}

/// Opens a fresh portal session for each logical operation
pub trait SessionFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn PortalApi>>;
}

/// Factory producing real HTTP sessions
#[derive(Debug, Clone, Default)]
pub struct HttpSessionFactory {
    config: PortalConfig,
}

impl HttpSessionFactory {
    pub fn new(config: PortalConfig) -> Self {
        Self { config }
    }
}

impl SessionFactory for HttpSessionFactory {
    fn open(&self) -> Result<Box<dyn PortalApi>> {
        Ok(Box::new(PortalSession::open(&self.config)?))
    }
}

/// One authenticated HTTP conversation with the portal
pub struct PortalSession {
    client: Option<Client>,
    base_url: String,
}

impl PortalSession {
    /// Acquire the underlying HTTP client. No request is sent yet.
    pub fn open(config: &PortalConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        debug!("Portal session opened for: {}", config.base_url);

        Ok(Self {
            client: Some(client),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Whether the session still holds its connection
    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    fn client(&self) -> Result<&Client> {
        self.client.as_ref().ok_or(Error::SessionClosed)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL with the cache-busting `_` parameter jQuery appends to XHR calls
    fn timestamped_url(&self, path: &str) -> String {
        let separator = if path.contains('?') { '&' } else { '?' };
        format!("{}{}{}_={}", self.base_url, path, separator, timestamp_millis())
    }

    fn xhr_get(&self, url: &str) -> Result<RequestBuilder> {
        Ok(self.client()?.get(url).header(XHR_HEADER, XHR_VALUE))
    }

    /// GET a server-rendered page and scrape its anti-forgery token
    async fn fetch_token(&self, path: &str) -> Result<String> {
        let url = self.timestamped_url(path);
        debug!("Fetching verification token from: {}", url);

        let response = send(self.xhr_get(&url)?).await?;
        let html = response.text().await?;
        extract_token(&html)
    }
}

#[async_trait]
impl PortalApi for PortalSession {
    async fn fetch_root_page(&self) -> Result<Vec<u8>> {
        let url = self.url("/");
        debug!("Loading root page: {}", url);

        let response = send(self.xhr_get(&url)?).await?;
        let body = response.bytes().await?;
        Ok(body.to_vec())
    }

    async fn login(&self, credentials: &Credentials) -> Result<bool> {
        let token = self.fetch_token(LOGIN_PAGE_PATH).await?;

        debug!("Posting login for: {}", credentials.username);

        let form = [
            (TOKEN_FIELD, token.as_str()),
            ("LoginEmail", credentials.username.as_str()),
            ("LoginPassword", credentials.password.as_str()),
        ];
        let request = self
            .client()?
            .post(self.url(LOGIN_POST_PATH))
            .header(XHR_HEADER, XHR_VALUE)
            .form(&form);

        let response = send(request).await?;
        let body = response.text().await?;
        let success = login_succeeded(&body)?;

        if success {
            info!("Logged in as {}", credentials.username);
        } else {
            info!("Login rejected for {}", credentials.username);
        }
        Ok(success)
    }

    async fn fetch_locations_and_meters(&self) -> Result<Value> {
        let url = self.timestamped_url(LOCATIONS_PATH);
        debug!("Fetching locations from: {}", url);

        let response = send(self.xhr_get(&url)?).await?;
        parse_json(response).await
    }

    async fn fetch_reading_windows(&self, location_id: &str, meter_serial: &str) -> Result<Value> {
        let token = self.fetch_token(READING_PAGE_PATH).await?;

        let body = json!({
            "param": {
                "I_ANLAGE": location_id,
                "I_SERGE": meter_serial,
            }
        });

        debug!(location_id, meter_serial, "Fetching reading windows");

        let request = self
            .client()?
            .post(self.url(READING_WINDOWS_PATH))
            .header(VERIFICATION_TOKEN_HEADER, token)
            .header(XHR_HEADER, XHR_VALUE)
            .header(ACCEPT, JSON_ACCEPT)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(CACHE_CONTROL, "no-cache")
            .body(body.to_string());

        let response = send(request).await?;
        parse_json(response).await
    }

    fn close(&mut self) -> bool {
        let released = self.client.take().is_some();
        if released {
            debug!("Portal session closed");
        }
        released
    }
}

/// Send a request and turn non-success statuses into errors
async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await?;

    if let Err(e) = response.error_for_status_ref() {
        error!("Portal request failed: {}", e);
        return Err(Error::Network(e));
    }

    Ok(response)
}

async fn parse_json(response: Response) -> Result<Value> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| Error::Protocol(format!("response is not JSON: {}", e)))
}

fn timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

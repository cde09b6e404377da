//! Client for the Felicity Solar «Shine» cloud.
//!
//! There is no published API: the login handshake is reverse-engineered from
//! the web app. The password travels RSA-encrypted with a public key scraped
//! from the front-end bundles (see [`extractor`]), and the returned bearer
//! token is an unverified JWT whose `exp` claim drives re-login.

pub mod cipher;
pub mod error;
pub mod extractor;
pub mod models;
mod response;
pub mod session;
#[cfg(test)]
mod tests;

use std::time::Duration;

use chrono::Local;
use http::{HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub use self::{
    error::Error,
    models::{DeviceRecord, DeviceType, Snapshot},
    session::Session,
};
use self::{
    error::{AuthenticationError, ExtractionError},
    extractor::{BundleKeyExtractor, PublicKeyExtractor},
    response::Response,
};
use crate::prelude::*;

pub const LOGIN_PAGE_URL: &str = "https://shine.felicitysolar.com/login";
pub const API_BASE_URL: &str = "https://shine-api.felicitysolar.com";

/// The fixed protocol version the login endpoint expects.
const LOGIN_PROTOCOL_VERSION: &str = "1.0";

pub struct Api {
    client: Client,
    email: String,
    password: String,
    login_page_url: String,
    api_base_url: String,
    extractor: Box<dyn PublicKeyExtractor>,

    /// Owned and mutated here only; everything else goes through
    /// [`Api::ensure_logged_in`].
    session: Option<Session>,

    /// Replaced wholesale on every listing, never merged.
    devices: Vec<DeviceRecord>,
}

impl Api {
    pub fn new(
        email: String,
        password: String,
        login_page_url: String,
        api_base_url: String,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.append("accept", HeaderValue::from_static("application/json, text/plain, */*"));
        let client = Client::builder()
            .user_agent("bluebird")
            .timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            email,
            password,
            login_page_url,
            api_base_url,
            extractor: Box::new(BundleKeyExtractor),
            session: None,
            devices: Vec::new(),
        })
    }

    /// Swap the key-extraction strategy (stubbed in tests).
    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn PublicKeyExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn devices(&self) -> &[DeviceRecord] {
        &self.devices
    }

    /// No-op while the current session is valid, full login otherwise.
    pub async fn ensure_logged_in(&mut self) -> Result<(), Error> {
        if self.session.as_ref().is_none_or(|session| !session.is_valid()) {
            self.login().await?;
        }
        Ok(())
    }

    /// Unconditional re-authentication. On failure the previous session is
    /// discarded, not kept around half-expired.
    #[instrument(skip_all, fields(email = %self.email))]
    pub async fn login(&mut self) -> Result<(), Error> {
        #[derive(Serialize)]
        struct UserLoginRequest<'a> {
            #[serde(rename = "userName")]
            user_name: &'a str,

            #[serde(rename = "password")]
            encrypted_password: &'a str,

            version: &'a str,
        }

        #[derive(Deserialize)]
        struct UserLoginData {
            token: Option<String>,
        }

        self.session = None;

        let public_key_pem = self.extract_public_key().await?;
        let encrypted_password = cipher::encrypt_password(&self.password, &public_key_pem)?;
        let response: Response<UserLoginData> = self
            .post("userlogin", &UserLoginRequest {
                user_name: &self.email,
                encrypted_password: &encrypted_password,
                version: LOGIN_PROTOCOL_VERSION,
            })
            .await?;
        let token = response
            .data
            .and_then(|data| data.token)
            .ok_or(AuthenticationError::MissingToken)?;
        let expires_at = session::decode_expiry(&token)?;
        info!(%expires_at, "logged in");
        self.session = Some(Session::new(token, expires_at));
        Ok(())
    }

    /// Scrape the front-end and recover the login RSA public key as PEM.
    ///
    /// Derived fresh on each login: the vendor may rotate the key material
    /// between web app deployments.
    #[instrument(skip_all)]
    pub async fn extract_public_key(&self) -> Result<String, Error> {
        let corpus = self.collect_login_corpus().await?;
        Ok(self.extractor.extract(&corpus)?)
    }

    /// List the devices tied to the account and replace the cached set.
    ///
    /// Only the first page of 10 is requested. Accounts with more devices
    /// are a known limitation of the protocol as reverse-engineered.
    #[instrument(skip_all)]
    pub async fn list_devices(&mut self) -> Result<Vec<DeviceRecord>, Error> {
        #[derive(Serialize)]
        struct ListDevicesRequest<'a> {
            #[serde(rename = "pageNum")]
            page_number: u32,

            #[serde(rename = "pageSize")]
            page_size: u32,

            #[serde(rename = "deviceSn")]
            serial_number: &'a str,

            status: &'a str,

            #[serde(rename = "sampleFlag")]
            sample_flag: &'a str,

            #[serde(rename = "oscFlag")]
            osc_flag: &'a str,
        }

        #[derive(Deserialize)]
        struct DeviceListData {
            #[serde(rename = "dataList", default)]
            devices: Vec<DeviceRecord>,
        }

        self.ensure_logged_in().await?;
        let response: Response<DeviceListData> = self
            .post("device/list_device_all_type", &ListDevicesRequest {
                page_number: 1,
                page_size: 10,
                serial_number: "",
                status: "",
                sample_flag: "",
                osc_flag: "",
            })
            .await?;
        self.devices = response.data.map(|data| data.devices).unwrap_or_default();
        info!(n_devices = self.devices.len(), "listed");
        Ok(self.devices.clone())
    }

    /// Fetch the current telemetry snapshot for one device.
    #[instrument(skip_all, fields(serial_number = serial_number))]
    pub async fn get_snapshot(&mut self, serial_number: &str) -> Result<Snapshot, Error> {
        #[derive(Serialize)]
        struct SnapshotRequest<'a> {
            #[serde(rename = "deviceSn")]
            serial_number: &'a str,

            // The web app always sends `BP` regardless of the actual device
            // type, and the server honors it.
            #[serde(rename = "deviceType")]
            device_type: &'a str,

            #[serde(rename = "dateStr")]
            date: String,
        }

        self.ensure_logged_in().await?;
        let response: Response<serde_json::Map<String, serde_json::Value>> = self
            .post("device/get_device_snapshot", &SnapshotRequest {
                serial_number,
                device_type: "BP",
                date: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            })
            .await?;
        let fields = response.data.ok_or(error::SnapshotError::MissingEnvelope)?;
        Ok(Snapshot::from_raw(fields)?)
    }

    /// Fetch the login page and every bundle the key hunt needs: the page
    /// itself, the versioned main bundle it references, and the login
    /// route's lazily loaded chunks.
    #[instrument(skip_all)]
    async fn collect_login_corpus(&self) -> Result<String, Error> {
        let response =
            self.client.get(self.login_page_url.as_str()).send().await?.error_for_status()?;
        let base_url = response.url().clone();
        let mut corpus = response.text().await?;

        let bundle_path = extractor::head_section(&corpus)
            .and_then(extractor::main_bundle_path)
            .ok_or(ExtractionError::MissingScriptReference)?
            .to_owned();

        // Individual bundle fetches are logged and skipped, not fatal: the
        // extraction itself reports what is actually missing afterwards.
        let mut asset_paths = Vec::new();
        match self.fetch_asset(&base_url, &bundle_path).await {
            Ok(bundle) => {
                asset_paths =
                    extractor::login_route_assets(&bundle).iter().map(ToString::to_string).collect();
                corpus.push_str("\n\n");
                corpus.push_str(&bundle);
            }
            Err(error) => warn!(path = %bundle_path, %error, "failed to fetch the main bundle"),
        }
        for path in asset_paths {
            match self.fetch_asset(&base_url, &path).await {
                Ok(chunk) => {
                    corpus.push_str("\n\n");
                    corpus.push_str(&chunk);
                }
                Err(error) => warn!(path = %path, %error, "failed to fetch a login chunk"),
            }
        }

        Ok(corpus)
    }

    async fn fetch_asset(&self, base_url: &Url, path: &str) -> Result<String> {
        let url = base_url.join(path).with_context(|| format!("failed to resolve `{path}`"))?;
        Ok(self.client.get(url).send().await?.error_for_status()?.text().await?)
    }

    #[instrument(skip_all, level = Level::DEBUG, fields(path = path))]
    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, Error>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let mut request = self
            .client
            .post(format!("{base_url}/{path}", base_url = self.api_base_url))
            .json(body);
        if let Some(session) = &self.session {
            request = request.header("authorization", session.token());
        }
        Ok(request.send().await?.error_for_status()?.json().await?)
    }
}

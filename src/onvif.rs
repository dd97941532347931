use crate::config::Credentials;
use crate::constants::{DEFAULT_DEVICE_TIMEOUT_SECS, DEVICE_PORT, DEVICE_SERVICE_PATH, NS_DEVICE};
use crate::error::{Result, SyncError};
use crate::protocol::{UsernameToken, XmlElement, envelope, response_body};
use chrono::{TimeDelta, Utc};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

/// One device-control session against a camera's ONVIF device service.
pub struct OnvifCam {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) timeout: Duration,

    pub(crate) credentials: Credentials,
    pub(crate) client: Client,

    // Device clock minus local clock, applied to WS-Security timestamps.
    pub(crate) adjust_time: bool,
    pub(crate) time_offset: Option<TimeDelta>,
}

impl OnvifCam {
    pub fn new(host: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            port: DEVICE_PORT,
            timeout: Duration::from_secs(DEFAULT_DEVICE_TIMEOUT_SECS),
            credentials,
            client: Client::new(),
            adjust_time: false,
            time_offset: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Share an HTTP client (and its connection pool) across sessions.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_time_adjust(mut self, adjust_time: bool) -> Self {
        self.adjust_time = adjust_time;
        self
    }

    pub fn service_url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, DEVICE_SERVICE_PATH)
    }

    pub(crate) fn record_device_time(&mut self, offset: TimeDelta) {
        if self.adjust_time && self.time_offset.is_none() {
            debug!("Device clock offset {}s used for security tokens", offset.num_seconds());
            self.time_offset = Some(offset);
        }
    }

    fn security_token(&self) -> UsernameToken {
        let created = Utc::now() + self.time_offset.unwrap_or_else(TimeDelta::zero);
        UsernameToken::new(
            &self.credentials.username,
            &self.credentials.password,
            created,
        )
    }

    /// Issue one device-service operation and return the SOAP Body of the reply.
    pub(crate) async fn send_request(&self, action: &str, body: &str) -> Result<XmlElement> {
        let token = self.security_token();
        let payload = envelope(Some(&token), body);
        let url = self.service_url();
        let content_type = format!(
            "application/soap+xml; charset=utf-8; action=\"{}/{}\"",
            NS_DEVICE, action
        );

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header(CONTENT_TYPE, content_type)
            .body(payload)
            .send()
            .await
            .map_err(|e| SyncError::DeviceUnreachable(format!("{} {}: {}", action, url, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SyncError::DeviceUnreachable(format!("{} {}: {}", action, url, e)))?;
        debug!("{} replied HTTP {}", action, status.as_u16());

        // Faults come back as 400/500 with a SOAP body; prefer the fault text.
        match response_body(&text) {
            Ok(body) if status.is_success() => Ok(body),
            Err(SyncError::DeviceProtocolError(message)) if text.contains("Fault") => Err(
                SyncError::DeviceProtocolError(format!("{} failed: {}", action, message)),
            ),
            Err(e) if status.is_success() => Err(e),
            _ => Err(SyncError::DeviceProtocolError(format!(
                "{} returned HTTP {}",
                action, status
            ))),
        }
    }
}

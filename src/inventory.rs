use crate::constants::INVENTORY_PATH;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};
use url::Url;

/// Monitor identifier. ZoneMinder sends it as a string, some versions as a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "RawMonitorId")]
pub struct MonitorId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMonitorId {
    Number(u64),
    Text(String),
}

impl From<RawMonitorId> for MonitorId {
    fn from(raw: RawMonitorId) -> Self {
        match raw {
            RawMonitorId::Number(n) => MonitorId(n.to_string()),
            RawMonitorId::Text(s) => MonitorId(s),
        }
    }
}

impl MonitorId {
    pub fn new(id: impl Into<String>) -> Self {
        MonitorId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl From<u64> for MonitorId {
    fn from(id: u64) -> Self {
        MonitorId(id.to_string())
    }
}

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Numeric ids in numeric order first, anything else after them lexically.
impl Ord for MonitorId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for MonitorId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Deserialize)]
struct MonitorsResponse {
    monitors: Vec<MonitorRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MonitorRow {
    monitor: MonitorRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MonitorRecord {
    id: MonitorId,
    path: String,
}

/// Host part of a monitor path, without scheme, credentials, port or path.
///
/// Bare `host[:port][/path]` values are read as if prefixed with `http://`.
/// Plain paths such as `/dev/video0` have no host.
pub fn host_from_path(path: &str) -> Option<String> {
    let path = path.trim();
    let parsed = match Url::parse(path) {
        Ok(url) if url.host_str().is_some() => url,
        _ if path.is_empty() || path.starts_with('/') || path.contains("://") => return None,
        _ => Url::parse(&format!("http://{}", path)).ok()?,
    };
    parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .map(str::to_string)
}

/// Source of the monitors to reconcile.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Map of monitor id to device address, ordered by id. Monitors whose
    /// path carries no host map to `None`.
    async fn list_monitors(&self) -> Result<BTreeMap<MonitorId, Option<String>>>;
}

/// ZoneMinder API client, reads `monitors.json`.
pub struct ZoneMinderClient {
    client: Client,
    base_url: Url,
}

impl ZoneMinderClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn monitors_url(&self) -> Result<Url> {
        self.base_url.join(INVENTORY_PATH).map_err(|e| {
            SyncError::ConfigurationError(format!("Invalid ZoneMinder URL {}: {}", self.base_url, e))
        })
    }
}

pub(crate) fn parse_monitors(body: &str) -> Result<BTreeMap<MonitorId, Option<String>>> {
    let response: MonitorsResponse = serde_json::from_str(body)
        .map_err(|e| SyncError::InventoryMalformed(format!("monitors.json: {}", e)))?;

    let mut monitors = BTreeMap::new();
    for row in response.monitors {
        let MonitorRecord { id, path } = row.monitor;
        let host = host_from_path(&path);
        if host.is_none() {
            warn!("Monitor {} has no host in Path '{}'", id, path);
        }
        monitors.insert(id, host);
    }
    Ok(monitors)
}

#[async_trait]
impl Inventory for ZoneMinderClient {
    async fn list_monitors(&self) -> Result<BTreeMap<MonitorId, Option<String>>> {
        let url = self.monitors_url()?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SyncError::InventoryUnavailable(format!("GET {}: {}", url, e)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::InventoryUnavailable(format!("GET {}: {}", url, e)))?;
        debug!("Got HTTP {}: {}", status.as_u16(), body);

        if !status.is_success() {
            return Err(SyncError::InventoryUnavailable(format!(
                "GET {} returned HTTP {}",
                url, status
            )));
        }

        let monitors = parse_monitors(&body)?;
        debug!("Got {} monitors: {:?}", monitors.len(), monitors);
        Ok(monitors)
    }
}

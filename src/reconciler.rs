use crate::clock::{Clock, SystemClock, gmt_offset_label};
use crate::commands::DeviceManagement;
use crate::config::Credentials;
use crate::constants::{
    DEFAULT_DEVICE_TIMEOUT_SECS, DEVICE_PORT, MAX_FAILURE_EXIT_CODE, TOLERANCE_SECS,
};
use crate::error::{Result, SyncError};
use crate::inventory::{Inventory, MonitorId};
use crate::onvif::OnvifCam;
use crate::types::SetDateTimeRequest;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Opens a device-control session for one device visit.
#[async_trait]
pub trait Connector: Send + Sync {
    type Device: DeviceManagement;

    async fn connect(&self, host: &str) -> Result<Self::Device>;
}

pub struct OnvifConnector {
    credentials: Credentials,
    client: Client,
    port: u16,
    timeout: Duration,
    adjust_time: bool,
}

impl OnvifConnector {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            client: Client::new(),
            port: DEVICE_PORT,
            timeout: Duration::from_secs(DEFAULT_DEVICE_TIMEOUT_SECS),
            adjust_time: false,
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

    pub fn with_time_adjust(mut self, adjust_time: bool) -> Self {
        self.adjust_time = adjust_time;
        self
    }
}

#[async_trait]
impl Connector for OnvifConnector {
    type Device = OnvifCam;

    async fn connect(&self, host: &str) -> Result<OnvifCam> {
        Ok(OnvifCam::new(host, self.credentials.clone())
            .with_client(self.client.clone())
            .with_port(self.port)
            .with_timeout(self.timeout)
            .with_time_adjust(self.adjust_time))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// `SetSystemDateAndTime` was issued and accepted.
    Updated,
    /// Device clock was within tolerance; nothing written.
    Skipped { delta_secs: i64 },
    /// A write was due but only logged.
    DryRun,
}

#[derive(Debug)]
pub struct DeviceReport {
    pub id: MonitorId,
    pub host: Option<String>,
    pub outcome: Result<Outcome>,
}

#[derive(Debug, Default)]
pub struct BatchResult {
    pub reports: Vec<DeviceReport>,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_err()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Number of failed devices, clamped below the fatal exit code.
    pub fn exit_code(&self) -> i32 {
        self.failed().min(MAX_FAILURE_EXIT_CODE as usize) as i32
    }

    pub fn report(&self, id: &MonitorId) -> Option<&DeviceReport> {
        self.reports.iter().find(|r| &r.id == id)
    }
}

pub struct Reconciler<I, C, K = SystemClock> {
    inventory: I,
    connector: C,
    clock: K,
    dry_run: bool,
    tz: String,
}

impl<I: Inventory, C: Connector> Reconciler<I, C, SystemClock> {
    pub fn new(inventory: I, connector: C) -> Self {
        Self::with_clock(inventory, connector, SystemClock)
    }
}

impl<I: Inventory, C: Connector, K: Clock> Reconciler<I, C, K> {
    pub fn with_clock(inventory: I, connector: C, clock: K) -> Self {
        let tz = gmt_offset_label(clock.local_offset());
        info!("Using local timezone: {}", tz);
        Self {
            inventory,
            connector,
            clock,
            dry_run: false,
            tz,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Timezone label sent to every device.
    pub fn timezone(&self) -> &str {
        &self.tz
    }

    /// Reconcile every monitor in id order.
    ///
    /// Inventory errors abort before any device is visited. Device errors are
    /// recorded in the batch, unless `fail_fast` is set, in which case the
    /// first one is returned and the remaining monitors are not visited.
    pub async fn run(&self, fail_fast: bool) -> Result<BatchResult> {
        let monitors = self.inventory.list_monitors().await?;
        debug!("Got {} monitors", monitors.len());

        let mut batch = BatchResult::default();
        for (id, host) in monitors {
            let shown = host.as_deref().unwrap_or("-");
            let span = info_span!("monitor", id = %id, host = %shown);
            let visit = match host.as_deref() {
                Some(address) => self.reconcile_one(&id, address).instrument(span).await,
                None => Err(SyncError::DeviceUnreachable(format!(
                    "Monitor {} has no host in its Path",
                    id
                ))),
            };
            let outcome = match visit {
                Err(e) if fail_fast => {
                    error!("Monitor {} ({}) failed, aborting: {}", id, shown, e);
                    return Err(e);
                }
                Err(e) => {
                    error!("Monitor {} ({}) failed: {}", id, shown, e);
                    Err(e)
                }
                ok => ok,
            };
            batch.reports.push(DeviceReport { id, host, outcome });
        }

        if batch.is_success() {
            info!(
                "Successfully set date and time on all {} monitors",
                batch.succeeded()
            );
        } else {
            error!(
                "Set date and time on {} monitors; {} failed",
                batch.succeeded(),
                batch.failed()
            );
        }
        Ok(batch)
    }

    /// Read one device's clock and correct it when it is off by a minute or more.
    pub async fn reconcile_one(&self, id: &MonitorId, host: &str) -> Result<Outcome> {
        info!("Handling monitor {} - hostname={}", id, host);
        let mut cam = self.connector.connect(host).await?;

        let hostname = cam.get_hostname().await?;
        debug!("Connected to camera with hostname {}", hostname);

        let reported = cam.get_system_date_and_time().await?;
        debug!("Camera GetSystemDateAndTime(): {:?}", reported);
        let device_time = reported.utc()?;

        let now = self.clock.now();
        let delta = (device_time - now).num_seconds().abs();
        if delta < TOLERANCE_SECS {
            info!(
                "Monitor {} ({}) system date/time of {} is {} seconds from now; do not update",
                id, host, device_time, delta
            );
            return Ok(Outcome::Skipped { delta_secs: delta });
        }
        info!(
            "Monitor {} ({}) system date/time of {} is {} seconds from now; updating",
            id, host, device_time, delta
        );

        let request = SetDateTimeRequest::manual(&self.tz, &now);
        let params = serde_json::to_string(&request).unwrap_or_else(|_| format!("{:?}", request));
        if self.dry_run {
            warn!(
                "DRY RUN: Would call SetSystemDateAndTime with params: {}",
                params
            );
            return Ok(Outcome::DryRun);
        }

        debug!("Call SetSystemDateAndTime with params: {}", params);
        cam.set_system_date_and_time(&request).await?;
        info!("Updated date/time on Monitor {} ({})", id, host);
        Ok(Outcome::Updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reports(ok: usize, failed: usize) -> BatchResult {
        let mut batch = BatchResult::default();
        for n in 0..ok + failed {
            let outcome = if n < ok {
                Ok(Outcome::Updated)
            } else {
                Err(SyncError::DeviceUnreachable("timed out".to_string()))
            };
            batch.reports.push(DeviceReport {
                id: MonitorId::from(n as u64),
                host: Some(format!("10.0.{}.{}", n / 256, n % 256)),
                outcome,
            });
        }
        batch
    }

    #[test]
    fn exit_code_is_the_failure_count() {
        assert_eq!(reports(3, 0).exit_code(), 0);
        assert_eq!(reports(3, 2).exit_code(), 2);
        assert_eq!(reports(0, 254).exit_code(), 254);
    }

    #[test]
    fn exit_code_is_clamped_below_fatal() {
        let batch = reports(1, 300);
        assert_eq!(batch.failed(), 300);
        assert_eq!(batch.exit_code(), MAX_FAILURE_EXIT_CODE);
        assert_ne!(batch.exit_code(), crate::constants::FATAL_EXIT_CODE);
    }
}

pub mod clock;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod inventory;
pub mod onvif;
pub mod protocol;
pub mod reconciler;
pub mod types;

pub use commands::*;
pub use config::{Config, Credentials};
pub use error::{Result, SyncError};
pub use inventory::{Inventory, MonitorId, ZoneMinderClient};
pub use onvif::OnvifCam;
pub use reconciler::{BatchResult, Connector, DeviceReport, OnvifConnector, Outcome, Reconciler};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Inventory unavailable: {0}")]
    InventoryUnavailable(String),

    #[error("Malformed inventory response: {0}")]
    InventoryMalformed(String),

    #[error("Device unreachable: {0}")]
    DeviceUnreachable(String),

    #[error("Device protocol error: {0}")]
    DeviceProtocolError(String),
}

impl SyncError {
    /// Configuration and inventory errors abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::ConfigurationError(_)
                | SyncError::InventoryUnavailable(_)
                | SyncError::InventoryMalformed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

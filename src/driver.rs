use std::sync::Arc;

use tracing::debug;

use crate::{
    config::{self, PortConfig},
    error::Error,
    hardware::Hardware,
    port::PortHandle,
};

/// The application's way into the driver.
///
/// Owns a hardware layer and opens ports on it. Cheap to clone; clones
/// share the same hardware layer.
#[derive(Clone)]
pub struct Driver {
    hardware: Arc<dyn Hardware>,
}

impl Driver {
    /// A driver on top of the given hardware layer.
    pub fn new(hardware: Arc<dyn Hardware>) -> Self {
        Self { hardware }
    }

    /// Validate `config` and acquire the port.
    ///
    /// This is the single success/failure channel: a rejected
    /// configuration and a transport failure both surface here,
    /// asynchronously, as structured errors. On success the returned
    /// handle is the one live owner of the line; opening the same port
    /// again before that handle goes away is
    /// [`crate::error::TransportError::AlreadyOpen`].
    ///
    /// A failed init leaves nothing allocated, and a closed handle
    /// leaks nothing into the next: re-initializing with any valid
    /// configuration starts from a clean slate.
    pub async fn init(&self, config: PortConfig) -> Result<PortHandle, Error> {
        let validated = config::validate(self.hardware.as_ref(), &config)?;

        debug!(port = %config.port, baud = config.baud, "Opening port");
        let link = self.hardware.open(&config.port, config.baud).await?;

        Ok(PortHandle::spawn(validated, link))
    }
}

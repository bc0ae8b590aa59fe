#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use serial_helm::{
    config::PortConfig, driver::Driver, logging, mock::MockHardware, port::PortHandle,
};
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};

pub const PORT: &str = "tty0";
pub const OTHER_PORT: &str = "tty1";
pub const BAUD: u32 = 115_200;

/// A driver on a fresh example bench, plus the bench side for feeding
/// wire bytes and observing transmissions.
pub fn bench_driver() -> (Driver, Arc<MockHardware>) {
    logging::init();

    let hardware = Arc::new(MockHardware::example());
    (Driver::new(hardware.clone()), hardware)
}

pub fn config(port: &str) -> PortConfig {
    PortConfig::new(port, BAUD)
}

/// Open `PORT` at the default baud rate on a fresh bench.
pub async fn open_port() -> Result<(PortHandle, Driver, Arc<MockHardware>)> {
    let (driver, hardware) = bench_driver();

    let handle = driver.init(config(PORT)).await?;

    Ok((handle, driver, hardware))
}

/// Receive one read event, with a deadline so a broken flush rule fails
/// the test instead of hanging it.
pub async fn next_read(reads: &mut broadcast::Receiver<Vec<u8>>) -> Result<Vec<u8>> {
    Ok(timeout(Duration::from_secs(5), reads.recv()).await??)
}

/// Assert that no read event shows up for a little while.
pub async fn assert_no_read(reads: &mut broadcast::Receiver<Vec<u8>>) {
    assert!(
        timeout(Duration::from_millis(200), reads.recv()).await.is_err(),
        "Expected silence, got a read event"
    );
}

/// Give the port's worker a beat to process what was just sent to it.
pub async fn settle() {
    sleep(Duration::from_millis(100)).await;
}

/// Keep trying to open `config` until the line frees up.
///
/// Useful after dropping a handle, where the release happens on the
/// worker's schedule rather than ours.
pub async fn eventually_opens(driver: &Driver, config: PortConfig) -> Result<PortHandle> {
    for _ in 0..100 {
        match driver.init(config.clone()).await {
            Ok(handle) => return Ok(handle),
            Err(_) => sleep(Duration::from_millis(20)).await,
        }
    }

    Err(color_eyre::eyre::eyre!("The line never freed up"))
}

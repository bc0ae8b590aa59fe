use color_eyre::Result;
use pretty_assertions::assert_eq;
use serial_helm::error::{ConfigError, Error, TransportError};

use common::{
    assert_no_read, bench_driver, config, eventually_opens, next_read, settle, BAUD, OTHER_PORT,
    PORT,
};
use serial_helm::config::PortConfig;

mod common;

#[tokio::test]
async fn an_unknown_port_is_refused() {
    let (driver, _hardware) = bench_driver();

    let refused = driver
        .init(PortConfig::new("value", BAUD))
        .await
        .unwrap_err();

    assert_eq!(
        refused,
        Error::Config(ConfigError::UnknownPort("value".into()))
    );
}

#[tokio::test]
async fn an_unsupported_baud_is_refused() {
    let (driver, _hardware) = bench_driver();

    let refused = driver
        .init(PortConfig::new(PORT, 12_345))
        .await
        .unwrap_err();

    assert_eq!(refused, Error::Config(ConfigError::UnsupportedBaud(12_345)));
}

#[tokio::test]
async fn every_valid_pair_opens() -> Result<()> {
    let (driver, _hardware) = bench_driver();

    let handle = driver.init(PortConfig::new(OTHER_PORT, 115_200)).await?;
    assert_eq!(handle.port(), OTHER_PORT);
    handle.close().await;

    let handle = driver.init(PortConfig::new(PORT, 9_600)).await?;
    assert_eq!(handle.port(), PORT);
    handle.close().await;

    Ok(())
}

#[tokio::test]
async fn a_port_opens_once_until_closed() -> Result<()> {
    let (driver, _hardware) = bench_driver();

    let first = driver.init(config(PORT)).await?;

    let refused = driver.init(config(PORT)).await.unwrap_err();
    assert_eq!(
        refused,
        Error::Transport(TransportError::AlreadyOpen(PORT.into()))
    );

    first.close().await;

    let again = driver.init(config(PORT)).await?;
    again.close().await;

    Ok(())
}

#[tokio::test]
async fn dropping_the_handle_frees_the_line() -> Result<()> {
    let (driver, _hardware) = bench_driver();

    let handle = driver.init(config(PORT)).await?;
    drop(handle);

    // The release rides on the worker's schedule, not ours.
    let reopened = eventually_opens(&driver, config(PORT)).await?;
    reopened.close().await;

    Ok(())
}

#[tokio::test]
async fn no_state_leaks_between_handles() -> Result<()> {
    let (driver, hardware) = bench_driver();

    // Leave three bytes buffered below the trigger minimum, then close.
    let first = driver.init(config(PORT)).await?;
    first.set_read_range(8, 16)?;
    settle().await;
    hardware.feed(PORT, b"abc")?;
    settle().await;
    first.close().await;

    // A fresh handle with a different configuration starts clean.
    let second = driver.init(PortConfig::new(PORT, 9_600)).await?;
    let mut reads = second.subscribe();

    // An eager range would have flushed any leftovers by now.
    second.set_read_range(1, 16)?;
    assert_no_read(&mut reads).await;

    hardware.feed(PORT, b"fresh")?;
    assert_eq!(next_read(&mut reads).await?, b"fresh".to_vec());

    second.close().await;

    Ok(())
}

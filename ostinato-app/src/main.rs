//! Ostinato - console looping host
//!
//! Wires the engine to the default cpal output device and a stdin control
//! front end.

mod config;
mod console;
mod driver;
mod looper;

use std::sync::Arc;

use anyhow::{anyhow, Context};
use ostinato_engine::{spawn_worker, ConfigLoopEvent, ControlFrontEnd, Engine};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use console::{spawn_console, ConsoleControl};
use driver::CpalDriver;
use looper::DemoLooperFactory;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load();
    info!(path = %AppConfig::config_path().display(), "configuration loaded");

    let engine = Arc::new(Engine::new(config.engine_config(), DemoLooperFactory));
    let driver = Arc::new(CpalDriver::new());

    engine
        .initialize(driver.clone(), &config.control_config(), |control| {
            Arc::new(ConsoleControl::bind(control)) as Arc<dyn ControlFrontEnd>
        })
        .context("engine failed to start")?;

    for _ in 0..config.initial_loops {
        engine.push_admin_event(ConfigLoopEvent::add(0, 0.0));
    }

    let worker = spawn_worker(engine.clone()).context("failed to spawn worker thread")?;
    // Blocked on stdin until the user quits; never joined
    let _console = spawn_console(engine.clone()).context("failed to spawn console thread")?;

    worker.join().map_err(|_| anyhow!("worker thread panicked"))?;

    driver.shutdown();
    engine.cleanup();
    info!("bye");
    Ok(())
}

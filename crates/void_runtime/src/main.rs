//! Void Sync Runtime
//!
//! Runs a small simulation in which an engine thread and a script thread
//! share one entity's transform through stack properties:
//! - Native component memory is owned by the engine thread
//! - Script writes go through property proxies and are flushed by a task queue
//! - Engine values keep native memory and properties in sync each tick
//!
//! Run with: cargo run -p void_runtime -- [config.toml]
//!
//! Environment overrides: `VOID_SYNC_QUEUE_MODE` (polling|threaded),
//! `VOID_SYNC_LOG` (log filter).

mod scene;

use void_property::config::{ConfigError, RuntimeConfig};

fn load_config() -> Result<RuntimeConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => RuntimeConfig::load(path),
        None => {
            let mut config = RuntimeConfig::default();
            config.apply_env()?;
            Ok(config)
        }
    }
}

fn main() {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(2);
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log.filter.as_str())).init();

    println!();
    println!("╔═══════════════════════════════════════════════════════════╗");
    println!("║                 VOID SYNC RUNTIME v0.1.0                  ║");
    println!("║                                                           ║");
    println!("║  Engine thread owns the memory. Scripts go through queues.║");
    println!("╚═══════════════════════════════════════════════════════════╝");
    println!();

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("PANIC: {}", panic_info);
    }));

    log::info!(
        "Queue: {} ('{}'), push mode {:?}, conflict policy {:?}",
        config.task_queue.mode,
        config.task_queue.name,
        config.engine.push_mode,
        config.engine.conflict_policy
    );

    if let Err(e) = scene::run(&config) {
        log::error!("Runtime failed: {}", e);
        std::process::exit(1);
    }
    log::info!("Runtime finished");
}

// src/main.rs
// 无界面演示：模拟丢包设备 -> 网关 -> 每秒一次 tick，并打印每台设备的速率
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{error, info};

use telescope::stream::{pump, SimulatedDevice};
use telescope::{Bounds, IngestionGateway, Registry, ScopeConfig, ScopeError};

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const RECEIVE_INTERVAL: Duration = Duration::from_millis(5);
const DEFAULT_RUN_SECS: u64 = 10;

fn load_config(path: Option<&str>) -> Result<ScopeConfig> {
    match path {
        Some(path) => ScopeConfig::from_path(path)
            .with_context(|| format!("failed to load config from {path}")),
        None => Ok(ScopeConfig::default()),
    }
}

fn spawn_receiver(gateway: IngestionGateway, mut device: SimulatedDevice) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        match pump(&mut device, &gateway, 1) {
            Ok(_) => thread::sleep(RECEIVE_INTERVAL),
            Err(ScopeError::NotRunning { .. }) => break,
            Err(e) => {
                error!("receiver stopped: {e}");
                break;
            }
        }
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let config = load_config(args.get(1).map(String::as_str))?;
    let run_secs = match args.get(2) {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("invalid run time {raw}"))?,
        None => DEFAULT_RUN_SECS,
    };

    let registry = Registry::new(config.clone(), &Bounds::new(640.0, 120.0))
        .context("failed to build device registry")?;
    let gateway = IngestionGateway::new(registry);
    gateway.start()?;

    let receivers: Vec<_> = config
        .device_ids
        .iter()
        .enumerate()
        .map(|(seed, id)| {
            let device =
                SimulatedDevice::new(id.as_str(), config.channel_count, config.cycle_length, seed as u64)
                    .with_loss(0.05)
                    .with_absent(0.01);
            spawn_receiver(gateway.clone(), device)
        })
        .collect();
    info!(
        "streaming {} devices x {} channels for {run_secs}s",
        config.device_ids.len(),
        config.channel_count
    );

    let started = Instant::now();
    let mut last_tick = Instant::now();
    while started.elapsed() < Duration::from_secs(run_secs) {
        thread::sleep(Duration::from_millis(50));
        let elapsed = last_tick.elapsed();
        if elapsed < TICK_INTERVAL {
            continue;
        }
        last_tick = Instant::now();
        let report = gateway.tick(elapsed)?;
        for device in &report.devices {
            let live: usize = device.channels.iter().map(|c| c.segments.len()).sum();
            // A renderer slides the drawn segments by this much over the next
            // second so the newest window lands on the right edge.
            let step = device
                .channels
                .first()
                .map_or(0.0, |c| c.remaining_space);
            info!(
                "Device {}: {} | render step {step:.1}px | {live} live segments \
                 (timeline scrolls {:.1}px/s, so this grows until the oldest passes x=0)",
                device.id,
                device.rate,
                config.time_scale
            );
        }
    }

    gateway.stop()?;
    for handle in receivers {
        if handle.join().is_err() {
            error!("receiver thread panicked");
        }
    }
    info!("stopped");
    Ok(())
}

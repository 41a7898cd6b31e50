//! CLI runner: resolves station names, wires the engine together, and waits
//! for the arrival alert.

use anyhow::{bail, Context, Result};
use stationwatch::audio::{list_input_devices, CpalCapture};
use stationwatch::catalog;
use stationwatch::config::AppConfig;
use stationwatch::engine::{EngineState, MonitorEngine};
use stationwatch::notify::ConsoleDispatcher;
use stationwatch::recents::RecentStations;
use stationwatch::recognition::WhisperService;
use stationwatch::survival::DesktopSurvival;
use stationwatch::telemetry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    telemetry::init_tracing(&config);

    if config.list_stations {
        for station in catalog::builtin_stations() {
            println!(
                "{:24} {:32} {:8} {}",
                station.name, station.name_alt, station.line, station.city
            );
        }
        return Ok(());
    }

    if config.list_input_devices {
        match list_input_devices() {
            Ok(devices) if devices.is_empty() => println!("no audio input devices found"),
            Ok(devices) => {
                println!("audio input devices:");
                for name in devices {
                    println!("  {name}");
                }
            }
            Err(err) => println!("failed to list audio input devices: {err}"),
        }
        return Ok(());
    }

    if config.targets.is_empty() {
        bail!("no stations given; try `stationwatch --list-stations` for the catalog");
    }

    let mut stations = Vec::new();
    for name in &config.targets {
        let station = catalog::find(name)
            .with_context(|| format!("unknown station '{name}'; see --list-stations"))?;
        stations.push(station);
    }

    record_recents(&stations);

    let service = Arc::new(WhisperService::new(config.recognizer_config()?)?);
    let capture = Box::new(CpalCapture::new(
        config.input_device.clone(),
        config.frame_samples,
    ));
    let dispatcher = Arc::new(ConsoleDispatcher::new(config.sounds));
    let survival = Box::new(DesktopSurvival::new(!config.no_keep_alive_tone));

    let handle = MonitorEngine::spawn(
        config.engine_config(),
        capture,
        service,
        dispatcher,
        survival,
    );

    for station in stations {
        handle.add_target(station);
    }
    if !config.foreground {
        handle.set_backgrounded(true);
    }

    // Run until every target has arrived and its alert wound down.
    loop {
        std::thread::sleep(Duration::from_millis(500));
        let status = handle.status();
        if status.state == EngineState::Idle && status.active_alerts.is_empty() {
            break;
        }
    }
    handle.shutdown();
    Ok(())
}

fn recents_path() -> PathBuf {
    std::env::var("STATIONWATCH_RECENTS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("stationwatch_recents.json"))
}

/// Best-effort update of the recent-target list the UI layer reads.
fn record_recents(stations: &[stationwatch::Station]) {
    let path = recents_path();
    let mut recents = std::fs::read_to_string(&path)
        .ok()
        .and_then(|json| RecentStations::from_json(&json).ok())
        .unwrap_or_default();
    for station in stations {
        recents.push(station.clone());
    }
    match recents.to_json() {
        Ok(json) => {
            if let Err(err) = std::fs::write(&path, json) {
                warn!("failed to write recent stations: {err}");
            }
        }
        Err(err) => warn!("failed to serialize recent stations: {err:#}"),
    }
}

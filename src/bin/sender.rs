//! Transport Sender Application
//!
//! Runs a free-running simulated host transport on a dedicated audio thread
//! and streams its state over OSC, exactly as a plugin instance would.
//!
//! Usage: `daw-osc-sender [host[:port]] [--config <path>] [--id <routing-id>]`

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use daw_osc_sender::{
    config::AppConfig,
    transport::{describe, SimulatedPlayHead},
    Session,
};

struct Args {
    target: Option<String>,
    config: Option<PathBuf>,
    routing_id: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args { target: None, config: None, routing_id: None };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => args.config = Some(iter.next().context("--config needs a path")?.into()),
            "--id" => args.routing_id = Some(iter.next().context("--id needs a value")?),
            _ => args.target = Some(arg),
        }
    }
    Ok(args)
}

/// Split `host[:port]` or `[v6-addr][:port]`; a bare IPv6 address is host only
fn split_target(target: &str) -> (String, Option<i64>) {
    if let Some(rest) = target.strip_prefix('[') {
        if let Some((host, tail)) = rest.split_once(']') {
            let port = tail.strip_prefix(':').and_then(|p| p.parse().ok());
            return (host.to_string(), port);
        }
    }
    match target.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => match port.parse() {
            Ok(port) => (host.to_string(), Some(port)),
            Err(_) => (target.to_string(), None),
        },
        _ => (target.to_string(), None),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting DAW OSC Sender");

    let args = parse_args()?;
    let config = AppConfig::load_or_default(args.config.as_deref())?;
    let session = Arc::new(Session::from_config(&config)?);

    if let Some(target) = &args.target {
        let (host, port) = split_target(target);
        session.set_host(&host)?;
        if let Some(port) = port {
            session.set_port(port)?;
        }
    }
    if let Some(id) = &args.routing_id {
        session.set_routing_id(id)?;
    }

    let endpoint = session.endpoint();
    tracing::info!("Target: {}:{} (routing id {:?})", endpoint.host, endpoint.port, endpoint.routing_id);

    session.start()?;

    // Simulated audio callback
    let sim = config.simulation.clone();
    let block_duration = Duration::from_secs_f64(sim.block_size as f64 / sim.sample_rate.max(1) as f64);
    let running = Arc::new(AtomicBool::new(true));
    let audio_thread = {
        let session = session.clone();
        let running = running.clone();
        thread::Builder::new().name("audio".to_string()).spawn(move || {
            let mut play_head = SimulatedPlayHead::new(
                sim.tempo_bpm,
                sim.time_sig_numerator,
                sim.time_sig_denominator,
                sim.sample_rate as f64,
            );
            play_head.set_playing(sim.playing);
            play_head.set_loop_bars(sim.loop_bars);

            let mut next_block = Instant::now();
            while running.load(Ordering::Relaxed) {
                session.on_block(Some(&play_head));
                play_head.advance(sim.block_size);

                next_block += block_duration;
                let now = Instant::now();
                if next_block > now {
                    thread::sleep(next_block - now);
                } else {
                    next_block = now;
                }
            }
        })?
    };

    tracing::info!(
        "Audio thread running: {} frames @ {} Hz ({:.1} ms blocks) - press Ctrl+C to stop",
        config.simulation.block_size,
        config.simulation.sample_rate,
        block_duration.as_secs_f64() * 1000.0
    );

    // Periodic status line
    let status_session = session.clone();
    let status_interval = Duration::from_millis(config.simulation.status_interval_ms.max(100));
    let status = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(status_interval);
        loop {
            ticker.tick().await;
            let stats = status_session.sender_stats();
            println!(
                "{}  |  {} batches sent, {} failed, {:.1} KB",
                describe(&status_session.latest_snapshot()),
                stats.batches_sent,
                stats.batches_failed,
                stats.bytes_sent as f64 / 1024.0
            );
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    status.abort();
    running.store(false, Ordering::Relaxed);
    if audio_thread.join().is_err() {
        tracing::error!("Audio thread panicked");
    }
    session.stop();

    let stats = session.sender_stats();
    let driver = session.driver();
    tracing::info!(
        "Final stats: {} blocks, {} batches sent, {} failed, {} datagrams, {} lookups, {} host failures",
        driver.blocks(),
        stats.batches_sent,
        stats.batches_failed,
        stats.datagrams_sent,
        stats.lookups,
        driver.host_failures()
    );

    Ok(())
}

//! OSC Monitor Application
//!
//! Listens on a UDP port and prints every OSC message it receives. Handy for
//! checking a sender without a full receiving application.
//!
//! Usage: `osc-monitor [port]`

use anyhow::{Context, Result};
use rosc::OscType;
use tokio::net::UdpSocket;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use daw_osc_sender::{constants::DEFAULT_PORT, protocol::decode_datagram};

fn format_arg(arg: &OscType) -> String {
    match arg {
        OscType::Float(v) => format!("f:{}", v),
        OscType::Double(v) => format!("d:{}", v),
        OscType::Int(v) => format!("i:{}", v),
        OscType::Long(v) => format!("h:{}", v),
        OscType::Bool(v) => format!("{}", if *v { "T" } else { "F" }),
        OscType::String(s) => format!("s:{:?}", s),
        other => format!("{:?}", other),
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

    let port: u16 = match std::env::args().nth(1) {
        Some(arg) => arg.parse().context("port must be a number")?,
        None => DEFAULT_PORT,
    };

    let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
    tracing::info!("Listening for OSC on {}", socket.local_addr()?);

    let mut buf = vec![0u8; 65536];
    let mut received: u64 = 0;
    let mut invalid: u64 = 0;

    loop {
        tokio::select! {
            result = socket.recv_from(&mut buf) => {
                let (size, from) = result?;
                match decode_datagram(&buf[..size]) {
                    Ok(messages) => {
                        for (addr, args) in messages {
                            received += 1;
                            let args: Vec<String> = args.iter().map(format_arg).collect();
                            println!("{}  {}  {}", from, addr, args.join(" "));
                        }
                    }
                    Err(e) => {
                        invalid += 1;
                        tracing::warn!("Invalid datagram from {}: {}", from, e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!("Monitor stats: {} messages, {} invalid datagrams", received, invalid);
    Ok(())
}

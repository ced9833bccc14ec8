//! Load simulator for the `fanout` registry.
//!
//! Registers simulated users through the hub loop, drains their buffers into
//! sinks and reports how many messages were delivered, dropped or unrouted.

mod cli;

use std::{error::Error, net::SocketAddr, sync::Arc};

use clap::Parser;
use fanout::{
    DropReason,
    LineTransport,
    Message,
    OutboundWriter,
    OverflowPolicy,
    Registry,
    RegistryConfig,
    SendOutcome,
    hub,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Default)]
struct Summary {
    delivered: usize,
    unrouted: usize,
    dropped_full: usize,
    dropped_closed: usize,
    dropped_encode: usize,
    written: usize,
}

impl Summary {
    fn record(&mut self, outcome: SendOutcome) {
        match outcome {
            SendOutcome::Delivered => self.delivered += 1,
            SendOutcome::NotConnected => self.unrouted += 1,
            SendOutcome::Dropped(DropReason::BufferFull) => self.dropped_full += 1,
            SendOutcome::Dropped(DropReason::BufferClosed) => self.dropped_closed += 1,
            SendOutcome::Dropped(DropReason::Encode) => self.dropped_encode += 1,
        }
    }
}

#[cfg(feature = "metrics")]
fn install_metrics(addr: Option<SocketAddr>) -> Result<(), Box<dyn Error>> {
    if let Some(addr) = addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!(%addr, "serving prometheus metrics");
    }
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_metrics(addr: Option<SocketAddr>) -> Result<(), Box<dyn Error>> {
    if addr.is_some() {
        tracing::warn!("built without the metrics feature; --metrics-addr ignored");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    install_metrics(cli.metrics_addr)?;

    let config = RegistryConfig {
        buffer_capacity: cli.capacity,
        overflow: match cli.overflow {
            cli::Overflow::Drop => OverflowPolicy::Drop,
            cli::Overflow::Evict => OverflowPolicy::Evict,
        },
        ..RegistryConfig::default()
    };
    config.validate()?;

    let registry = Arc::new(Registry::new(&config));
    let shutdown = CancellationToken::new();
    let (hub, hub_task) = hub::spawn(Arc::clone(&registry), &config, shutdown.clone());

    let mut handles = Vec::with_capacity(cli.users);
    let mut writers = Vec::new();
    let mut stalled = Vec::new();
    for n in 0..cli.users {
        let (handle, outbound) = config.connection(format!("user-{n}"), "candidate").build()?;
        hub.register(handle.clone()).await?;
        if n < cli.stalled {
            stalled.push(outbound);
        } else {
            let writer = OutboundWriter::new(
                outbound,
                LineTransport::new(tokio::io::sink()),
                shutdown.clone(),
            );
            writers.push(tokio::spawn(writer.run()));
        }
        handles.push(handle);
    }
    hub.sync().await?;
    info!(users = registry.len(), stalled = stalled.len(), "users connected");

    let mut summary = Summary::default();
    for round in 0..cli.messages {
        for n in 0..cli.users {
            let message = Message::new(
                "chat",
                "simulator",
                format!("user-{n}"),
                format!("message {round}"),
            )
            .with_sender_role("employer");
            summary.record(hub.send_to_user(&message.receiver_id, &message));
        }
        tokio::task::yield_now().await;
    }
    summary.record(hub.send_to_user(
        "offline",
        &Message::new("status", "simulator", "offline", "ping"),
    ));

    for handle in handles {
        hub.unregister(handle).await?;
    }
    hub.sync().await?;
    shutdown.cancel();
    drop(stalled);
    for written in futures::future::try_join_all(writers).await? {
        summary.written += written?;
    }
    hub_task.await?;

    info!(?summary, "simulation finished");
    println!(
        "delivered={} written={} unrouted={} dropped_full={} dropped_closed={} dropped_encode={}",
        summary.delivered,
        summary.written,
        summary.unrouted,
        summary.dropped_full,
        summary.dropped_closed,
        summary.dropped_encode,
    );
    Ok(())
}

//! Command line interface for the `fanout` load simulator.

use std::net::SocketAddr;

use clap::{Parser, ValueEnum};

/// Overflow handling selectable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Overflow {
    Drop,
    Evict,
}

/// Command line arguments for the `fanout` binary.
#[derive(Debug, Parser)]
#[command(
    name = "fanout",
    version,
    about = "Simulate message fan-out to connected users"
)]
pub struct Cli {
    /// Number of simulated connections.
    #[arg(short, long, default_value_t = 100)]
    pub users: usize,

    /// Messages sent to each user.
    #[arg(short, long, default_value_t = 50)]
    pub messages: usize,

    /// Outbound buffer capacity per connection.
    #[arg(short, long, default_value_t = 256)]
    pub capacity: usize,

    /// What to do when a user's buffer is full.
    #[arg(long, value_enum, default_value_t = Overflow::Drop)]
    pub overflow: Overflow,

    /// Users whose writer never drains, forcing drops.
    #[arg(long, default_value_t = 0)]
    pub stalled: usize,

    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Overflow};

    #[test]
    fn parses_simulation_options() {
        let cli = Cli::parse_from([
            "fanout",
            "--users",
            "3",
            "--capacity",
            "8",
            "--overflow",
            "evict",
            "--stalled",
            "1",
        ]);
        assert_eq!(cli.users, 3);
        assert_eq!(cli.capacity, 8);
        assert_eq!(cli.overflow, Overflow::Evict);
        assert_eq!(cli.stalled, 1);
        assert_eq!(cli.messages, 50);
        assert!(cli.metrics_addr.is_none());
    }
}

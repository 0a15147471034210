use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use genix_core::{OverlayConfig, QueuePolicy};
use std::path::PathBuf;

/// Body completion policy of the render queues
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum PolicyArg {
    /// Finish each answer before the next header
    Sequential,
    /// Start the next header once the settle delay has elapsed
    Overlapping,
}

impl From<PolicyArg> for QueuePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Sequential => QueuePolicy::Sequential,
            PolicyArg::Overlapping => QueuePolicy::Overlapping,
        }
    }
}

#[derive(Parser)]
#[command(name = "genix")]
#[command(version, about = "Genix - live support chat overlay for incident feeds")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (defaults to ~/.config/genix/config.toml)
    #[arg(long, global = true, env = "GENIX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Live feed websocket endpoint
    #[arg(long, global = true, env = "GENIX_LIVE_URL")]
    pub live_url: Option<String>,

    /// Search websocket endpoint
    #[arg(long, global = true, env = "GENIX_SEARCH_URL")]
    pub search_url: Option<String>,

    /// Delay between two typed content nodes, in milliseconds
    #[arg(long, global = true, env = "GENIX_TYPING_INTERVAL_MS")]
    pub typing_interval_ms: Option<u64>,

    /// Pause between a message header and its answer, in milliseconds
    #[arg(long, global = true, env = "GENIX_SETTLE_DELAY_MS")]
    pub settle_delay_ms: Option<u64>,

    /// Queue policy
    #[arg(long, global = true, env = "GENIX_POLICY", value_enum)]
    pub policy: Option<PolicyArg>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print the resolved configuration as TOML
    Config {
        /// Also write it to the config file
        #[arg(long)]
        save: bool,
    },
}

impl Cli {
    /// Apply command line (and environment) overrides on top of the file
    /// configuration.
    pub fn apply_overrides(&self, config: &mut OverlayConfig) {
        if let Some(url) = &self.live_url {
            config.live_url = url.clone();
        }
        if let Some(url) = &self.search_url {
            config.search_url = url.clone();
        }
        if let Some(interval) = self.typing_interval_ms {
            config.typing_interval_ms = interval;
        }
        if let Some(delay) = self.settle_delay_ms {
            config.settle_delay_ms = delay;
        }
        if let Some(policy) = self.policy {
            config.queue_policy = policy.into();
        }
    }
}

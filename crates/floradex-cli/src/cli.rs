//! CLI argument definitions for floradex.
//!
//! The binary is the admin trigger surface for the ingestion core: each
//! command is a thin pass-through into the sync engine, provider clients,
//! and alert dispatcher. It is meant to be invoked by cron or by an
//! operator, run to completion, and exit.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `import` | Run one bounded import batch for a provider |
//! | `enrich` | Run one enrichment batch over stale drafts |
//! | `status` | Show stats, checkpoint, and circuit state |
//! | `health` | Show derived health scores |
//! | `alerts` | Show recent alerts from the durable log |
//! | `reset` | Reset stats, breaker, and optionally the checkpoint |
//! | `watch` | Run the periodic alert watcher until interrupted |

use clap::{Args, Parser, Subcommand, ValueEnum};

use floradex_core::ProviderId;

/// Botanical reference data ingestion for the floradex content platform.
#[derive(Debug, Parser)]
#[command(
    name = "floradex",
    author,
    version,
    about = "Resilient botanical data ingestion CLI",
    long_about = "Floradex ingests botanical reference data from third-party APIs \
(Trefle, Permapeople) into a local content database.\n\
\n\
  • Checkpointed, resumable paginated imports\n\
  • Per-provider circuit breaker, retry policy, and rate gate\n\
  • Health scoring and alerting over request stats\n\
\n\
Use 'floradex <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one bounded import batch for a provider.
    Import(ImportArgs),
    /// Run one enrichment batch over stale or never-synced drafts.
    Enrich(EnrichArgs),
    /// Show request stats, checkpoint, and circuit state per provider.
    Status(StatusArgs),
    /// Show derived health scores per provider.
    Health(StatusArgs),
    /// Show recent alerts from the durable log.
    Alerts(AlertsArgs),
    /// Reset stats and circuit breaker for a provider.
    Reset(ResetArgs),
    /// Run the periodic alert watcher until interrupted.
    Watch(WatchArgs),
}

/// Provider selector shared by most commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderArg {
    Trefle,
    Permapeople,
}

impl From<ProviderArg> for ProviderId {
    fn from(value: ProviderArg) -> Self {
        match value {
            ProviderArg::Trefle => ProviderId::Trefle,
            ProviderArg::Permapeople => ProviderId::Permapeople,
        }
    }
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Provider to import from.
    #[arg(value_enum)]
    pub provider: ProviderArg,

    /// Override the number of pages fetched this run.
    #[arg(long)]
    pub pages: Option<u32>,

    /// Override the page size requested from the provider.
    #[arg(long)]
    pub page_size: Option<u32>,
}

#[derive(Debug, Args)]
pub struct EnrichArgs {
    /// Provider to enrich against.
    #[arg(value_enum)]
    pub provider: ProviderArg,

    /// Override the enrichment batch size.
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Restrict output to one provider.
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,
}

#[derive(Debug, Args)]
pub struct AlertsArgs {
    /// Maximum number of alerts to show.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct ResetArgs {
    /// Provider to reset.
    #[arg(value_enum)]
    pub provider: ProviderArg,

    /// Also forget the import checkpoint.
    #[arg(long, default_value_t = false)]
    pub checkpoint: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between alert checks.
    #[arg(long, default_value_t = 60)]
    pub interval_secs: u64,
}

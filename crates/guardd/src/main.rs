//! guardd - failguard daemon
//!
//! Watches SSH auth logs and blocks brute-force sources through ipset and
//! iptables. Also exposes manual firewall subcommands for operators.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use guard_audit::{AuditLedger, TracingLedger};
use guard_firewall::{Firewall, IpsetFirewall, SystemRunner};
use guardd::{GuardConfig, Pipeline, TracingSink};

#[derive(Parser)]
#[command(name = "guardd")]
#[command(about = "SSH brute-force detection and response daemon")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the detection daemon
    Run {
        /// Path to config file
        #[arg(short, long, default_value = "/etc/failguard/config.json")]
        config: PathBuf,
    },

    /// Reconcile the firewall set and rule, then exit
    Ensure {
        /// Path to config file
        #[arg(short, long, default_value = "/etc/failguard/config.json")]
        config: PathBuf,
    },

    /// List currently blocked addresses
    List {
        /// Path to config file
        #[arg(short, long, default_value = "/etc/failguard/config.json")]
        config: PathBuf,
    },

    /// Block an address manually
    Block {
        /// Address to block
        ip: String,

        /// Block duration in seconds (defaults to the configured duration)
        #[arg(long)]
        duration: Option<u64>,

        /// Path to config file
        #[arg(short, long, default_value = "/etc/failguard/config.json")]
        config: PathBuf,
    },

    /// Unblock an address manually
    Unblock {
        /// Address to unblock
        ip: String,

        /// Path to config file
        #[arg(short, long, default_value = "/etc/failguard/config.json")]
        config: PathBuf,
    },

    /// Generate a sample config file
    InitConfig {
        /// Path to write config
        #[arg(short, long, default_value = "/etc/failguard/config.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("guardd=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            run_daemon(config).await?;
        }

        Commands::Ensure { config } => {
            let config = GuardConfig::load_or_default(config)?;
            firewall_for(&config).ensure()?;
            println!("firewall set and rule verified");
        }

        Commands::List { config } => {
            let config = GuardConfig::load_or_default(config)?;
            for address in firewall_for(&config).list()? {
                println!("{address}");
            }
        }

        Commands::Block {
            ip,
            duration,
            config,
        } => {
            let config = GuardConfig::load_or_default(config)?;
            let duration = duration.unwrap_or(config.block_seconds);
            firewall_for(&config).block(&ip, duration, "manual block")?;
            println!("blocked {ip} for {duration}s");
        }

        Commands::Unblock { ip, config } => {
            let config = GuardConfig::load_or_default(config)?;
            firewall_for(&config).unblock(&ip)?;
            println!("unblocked {ip}");
        }

        Commands::InitConfig { output } => {
            init_config(&output)?;
        }
    }

    Ok(())
}

async fn run_daemon(config_path: PathBuf) -> anyhow::Result<()> {
    info!(config = %config_path.display(), "starting guardd");

    let config = GuardConfig::load_or_default(&config_path)?;
    info!(
        threshold = config.failures_threshold,
        window_secs = config.window_seconds,
        block_secs = config.block_seconds,
        sources = config.log_paths.len(),
        "configuration loaded",
    );

    let firewall: Arc<dyn Firewall> = Arc::new(firewall_for(&config));
    let ledger: Arc<dyn AuditLedger> = Arc::new(TracingLedger);
    let pipeline = Arc::new(Pipeline::new(
        &config,
        firewall,
        ledger,
        Arc::new(TracingSink),
    )?);

    pipeline.run().await;
    Ok(())
}

fn firewall_for(config: &GuardConfig) -> IpsetFirewall {
    IpsetFirewall::new(
        &config.set_name,
        &config.chain_name,
        Arc::new(SystemRunner),
        Arc::new(TracingLedger),
    )
}

fn init_config(output: &PathBuf) -> anyhow::Result<()> {
    let config = GuardConfig::default();
    let json = serde_json::to_string_pretty(&config)?;
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, json)?;
    println!("wrote sample config to {}", output.display());
    Ok(())
}

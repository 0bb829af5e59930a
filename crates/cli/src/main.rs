//! Milestone CLI - view-count monitoring and milestone forecasting.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use milestone_core::ItemId;
use milestone_monitor::{
    AppConfig, BilibiliSampler, MonitorDeps, MonitorManager, DEFAULT_CONFIG_FILE,
};
use milestone_notify::{Broadcaster, OneBotClient, TransportConfig};
use milestone_storage::{JsonStorage, Storage};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "milestone")]
#[command(about = "Track video views and forecast milestones", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Directory holding per-item data
    #[arg(long, global = true, default_value = ".")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor items until Ctrl+C or their final milestone
    Watch {
        /// Item ids (BV...)
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show stored samples and recent increments
    Status {
        /// Item id
        id: String,
        /// Number of recent increments to show
        #[arg(long, default_value = "10")]
        window: usize,
    },
    /// Push report cards to the configured targets
    Push {
        /// Item ids; several ids are sent as one message
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Compare the two stored encodings of a history
    Check {
        /// Item id
        id: String,
    },
    /// Show or change the configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set the global polling interval (seconds)
    Interval {
        /// Seconds, must be positive
        secs: i64,
    },
    /// Set or clear the interval of one item
    ItemInterval {
        /// Item id
        id: String,
        /// Seconds; omit to use the global interval
        secs: Option<i64>,
    },
}

/// Process-wide collaborators.
struct App {
    manager: MonitorManager,
    client: Option<Arc<OneBotClient>>,
}

impl App {
    async fn open(config: AppConfig, data_dir: &Path) -> Result<Self> {
        let storage = Arc::new(JsonStorage::new(data_dir).await?);
        let mut deps = MonitorDeps::new(storage, Arc::new(BilibiliSampler::new()));

        let client = if config.notify.is_active() {
            let mut transport = TransportConfig::new(config.notify.onebot_http_url.clone());
            transport.access_token = config.notify.onebot_access_token.clone();
            let client = Arc::new(OneBotClient::spawn(transport));
            deps = deps.with_broadcaster(Broadcaster::new(client.clone(), config.notify.clone()));
            Some(client)
        } else {
            if config.notify.onebot_enabled {
                warn!("notifications enabled but onebot_http_url is empty");
            }
            None
        };

        Ok(Self { manager: MonitorManager::new(deps, config), client })
    }

    async fn shutdown(&self) {
        if let Some(client) = &self.client {
            if !client.flush(Duration::from_secs(15)).await {
                warn!(pending = client.pending(), "dropping undelivered notifications");
            }
            client.shutdown().await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(&cli.config).await;

    match cli.command {
        Commands::Watch { ids } => {
            let mut app = App::open(config, &cli.data_dir).await?;
            for raw in &ids {
                app.manager.add(raw).await?;
            }
            let started = app.manager.start_all();
            info!(count = started, "monitoring, press Ctrl+C to stop");

            let finished = tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result?;
                    false
                }
                _ = app.manager.join_all() => true,
            };
            if finished {
                info!("all monitors finished");
            } else {
                info!("shutting down");
                app.manager.stop_all();
                app.manager.join_all().await;
            }
            app.shutdown().await;
        }
        Commands::Status { id, window } => {
            let mut app = App::open(config, &cli.data_dir).await?;
            let id = app.manager.add(&id).await?;
            if let Some(monitor) = app.manager.get(&id) {
                println!("{}", monitor.status(window).await);
            }
        }
        Commands::Push { ids } => {
            let mut app = App::open(config, &cli.data_dir).await?;
            for raw in &ids {
                app.manager.add(raw).await?;
            }
            let sent = match app.manager.ids().as_slice() {
                [single] => app.manager.push(single).await?,
                _ => app.manager.push_all().await?,
            };
            app.shutdown().await;
            if sent {
                println!("Pushed");
            } else {
                println!("Nothing was sent (notifications disabled or no targets)");
            }
        }
        Commands::Check { id } => {
            let id = ItemId::new(&id)?;
            let storage = JsonStorage::new(&cli.data_dir).await?;
            let report = storage.check_consistency(&id).await?;
            println!("{}: {}", id, report.status);
            println!("  Samples recovered: {}", report.samples.len());
            if !report.is_consistent() {
                std::process::exit(1);
            }
        }
        Commands::Config { action } => {
            match action {
                None => {}
                Some(ConfigAction::Interval { secs }) => {
                    config.set_default_interval(secs)?;
                    config.save(&cli.config).await?;
                }
                Some(ConfigAction::ItemInterval { id, secs }) => {
                    let id = ItemId::new(&id)?;
                    config.set_override(&id, secs)?;
                    config.save(&cli.config).await?;
                }
            }
            print_config(&config);
        }
    }

    Ok(())
}

fn print_config(config: &AppConfig) {
    println!("Default interval: {}s", config.default_interval);
    for (id, secs) in &config.intervals {
        println!("  {}: {}s", id, secs);
    }
    let notify = &config.notify;
    println!("OneBot: {}", if notify.onebot_enabled { "enabled" } else { "disabled" });
    if !notify.onebot_http_url.is_empty() {
        println!("  URL: {}", notify.onebot_http_url);
    }
    println!("  Groups: {:?}", notify.onebot_group_ids);
    println!("  Users: {:?}", notify.onebot_user_ids);
}

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use feedy::{Application, Config, Result};

/// Actor recorded in the audit log for command line changes.
const CLI_ACTOR: &str = "cli";

#[derive(Parser)]
#[command(name = "feedy")]
#[command(about = "RSS/Atom feed notifier for Channel Talk groups", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the Channel Talk function webhook
    Runserver,
    /// Subscribe a group to a feed
    Subscribe {
        #[command(flatten)]
        target: Target,
        /// Feed URL
        #[arg(long)]
        url: String,
        /// Bot name used for this subscription's messages
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Unsubscribe a group from a feed
    Unsubscribe {
        #[command(flatten)]
        target: Target,
        /// Feed id
        #[arg(long)]
        id: i64,
    },
    /// List the feeds a group is subscribed to
    List {
        #[command(flatten)]
        target: Target,
        /// Also post the list to the group
        #[arg(long)]
        notify: bool,
    },
    /// Deliver new feed items to subscribers
    Publish {
        /// Feed id to publish
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        id: Option<i64>,
        /// Publish every feed
        #[arg(long)]
        all: bool,
    },
}

#[derive(Args)]
struct Target {
    /// Channel id
    #[arg(long)]
    channel: String,
    /// Group id
    #[arg(long)]
    group: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load_with_env(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", cli.config.display());
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = feedy::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        feedy::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: Config) -> Result<()> {
    let app = Application::from_config(config).await?;
    let usecase = app.usecase();

    let result = match command {
        Commands::Runserver => app.serve().await,
        Commands::Subscribe { target, url, name } => usecase
            .subscribe(CLI_ACTOR, &target.channel, &target.group, &url, &name)
            .await
            .map(|sub| info!("Subscribed: subscription {} (feed {})", sub.id, sub.feed_id)),
        Commands::Unsubscribe { target, id } => usecase
            .unsubscribe(CLI_ACTOR, &target.channel, &target.group, id)
            .await
            .map(|()| info!("Unsubscribed from feed {}", id)),
        Commands::List { target, notify } => usecase
            .list_subscribed_feeds(&target.channel, &target.group, notify)
            .await
            .map(|feeds| {
                if feeds.is_empty() {
                    println!("No Subscriptions");
                }
                for feed in feeds {
                    println!("{}\t{}\t{}", feed.id, feed.name, feed.url);
                }
            }),
        Commands::Publish { id: Some(id), .. } => usecase.publish_feed(id).await,
        Commands::Publish { id: None, .. } => usecase.publish_all_feeds().await,
    };

    app.shutdown().await;
    result
}

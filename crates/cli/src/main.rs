use clap::{Parser, Subcommand};
use lib::channels::{LineClient, OutboundPush, PlatformClient};

#[derive(Parser)]
#[command(name = "linebot")]
#[command(about = "LINE webhook responder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the webhook server (POST /webhook, POST /send-message, GET /).
    Serve {
        /// Config file path (default: LINEBOT_CONFIG_PATH or ~/.linebot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Listen port (default: PORT env, then config, then 8080)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Push one text message to a user and exit.
    Push {
        /// Config file path (default: LINEBOT_CONFIG_PATH or ~/.linebot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Target user id (e.g. U4af4980629...).
        #[arg(long, value_name = "USER_ID")]
        to: String,

        /// Message text.
        text: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("linebot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("serve failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Push { config, to, text }) => {
            if let Err(e) = run_push(config, to, text).await {
                log::error!("push failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (config, path) = lib::config::load_config(config_path)?;
    log::debug!("loaded config from {}", path.display());
    lib::gateway::run_gateway(config, port).await
}

async fn run_push(
    config_path: Option<std::path::PathBuf>,
    to: String,
    text: String,
) -> anyhow::Result<()> {
    let (config, _) = lib::config::load_config(config_path)?;
    let Some(token) = lib::config::resolve_channel_access_token(&config) else {
        anyhow::bail!(
            "channel access token not configured (set LINE_CHANNEL_ACCESS_TOKEN or line.channelAccessToken)"
        );
    };
    let client = LineClient::new(lib::config::resolve_api_base_url(&config), token);
    client
        .push(&OutboundPush {
            target_user_id: to.clone(),
            text,
        })
        .await?;
    println!("pushed message to {}", to);
    Ok(())
}

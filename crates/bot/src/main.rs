mod config;
mod handler;
mod logging;
mod plugins;
mod router;
mod session;

use core::time::Duration;
use std::{
    fs,
    io::{BufRead as _, IsTerminal as _, Write as _},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{Context as _, Result, anyhow, bail};
use clap::Parser;
use matrix_sdk::{
    Client, config::SyncSettings, room::Room,
    ruma::events::room::message::OriginalSyncRoomMessageEvent,
};
use plugin_core::{dispatch::ReplyQueue, send_to_room};
use tokio::sync::Notify;
use tracing::{info, level_filters::LevelFilter, warn};

use crate::{
    config::{BotSettings, SettingsInput, load_config},
    handler::MessageHandler,
    logging::init_tracing,
    session::{Credentials, sign_in},
};

#[derive(Parser, Debug)]
#[command(
    name = "link-preview-bot",
    version,
    about = "Matrix bot that posts previews of video and post links"
)]
struct Args {
    /// Homeserver base URL, e.g. `https://matrix-client.matrix.org`.
    #[arg(long, env = "MATRIX_HOMESERVER")]
    homeserver: String,

    /// Username (localpart or full user ID)
    #[arg(long, env = "MATRIX_USERNAME")]
    username: String,

    /// Password (if omitted, will prompt if needed)
    #[arg(long, env = "MATRIX_PASSWORD")]
    password: Option<String>,

    /// Room to join: `!room_id:server` or `#alias:server` (prompted if omitted)
    #[arg(long, env = "MATRIX_ROOM")]
    room: Option<String>,

    /// Nickname the bot answers to (prompted if omitted)
    #[arg(long, env = "MATRIX_NICK")]
    nick: Option<String>,

    /// User ID allowed to send SHUTDOWN and RELOAD
    #[arg(long, env = "MATRIX_OWNER")]
    owner: Option<String>,

    /// Directory for persistent state (encryption keys, sync cache)
    #[arg(long, env = "MATRIX_STORE", default_value = "./bot-store")]
    store: PathBuf,

    /// JSON session file for access token/device info
    #[arg(long, env = "MATRIX_SESSION_FILE", default_value = "./session.json")]
    session_file: PathBuf,

    /// Device display name
    #[arg(long, env = "MATRIX_DEVICE_NAME", default_value = "link-preview-bot")]
    device_name: String,

    /// Path to the YAML config (acknowledgement word, plugin specs)
    #[arg(long, env = "MATRIX_CONFIG", default_value = "./config.yaml")]
    config: PathBuf,

    /// Directory holding per-plugin `<id>/config.yaml` overlays
    #[arg(long, env = "PLUGINS_DIR", default_value = "./plugins")]
    plugins_dir: PathBuf,

    /// Sync timeout in milliseconds
    #[arg(long, env = "MATRIX_SYNC_TIMEOUT_MS", default_value_t = 30000)]
    sync_timeout_ms: u64,

    /// Only log errors
    #[arg(short, long, conflicts_with = "debug")]
    quiet: bool,

    /// Log debug output
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    const fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::ERROR
        } else if self.debug {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present so clap can pick up env vars.
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    init_tracing(args.log_level());

    let config = load_config(&args.config)?;
    let settings = Arc::new(BotSettings::resolve(
        &SettingsInput {
            room: args.room.as_deref(),
            nick: args.nick.as_deref(),
            owner: args.owner.as_deref(),
            config_path: &args.config,
            plugins_dir: &args.plugins_dir,
        },
        &config,
        prompt_line,
    )?);

    fs::create_dir_all(&args.store)
        .with_context(|| format!("creating store directory at {}", args.store.display()))?;

    let client = Client::builder()
        .homeserver_url(&args.homeserver)
        .handle_refresh_tokens()
        .sqlite_store(&args.store, None)
        .build()
        .await
        .context("building matrix client")?;

    sign_in(
        &client,
        &Credentials {
            username: &args.username,
            password: args.password.as_deref(),
            device_name: &args.device_name,
            session_file: &args.session_file,
        },
    )
    .await?;

    if let Err(e) = client.account().set_display_name(Some(settings.nick.as_str())).await {
        warn!(error = %e, nick = %settings.nick, "Failed to set display name");
    }

    let room = client
        .join_room_by_id_or_alias(&settings.room, &[])
        .await
        .with_context(|| format!("joining room {}", settings.room))?;
    info!(room_id = %room.room_id(), nick = %settings.nick, owner = ?settings.owner, "Joined room");

    let registry = plugins::build_registry(&config, &settings).await;

    // Catch up once before registering handlers so backlog is not previewed.
    let initial = client
        .sync_once(SyncSettings::default())
        .await
        .context("initial sync")?;

    let shutdown = Arc::new(Notify::new());
    let handler = Arc::new(MessageHandler {
        settings: Arc::clone(&settings),
        registry,
        room_id: room.room_id().to_owned(),
        shutdown: Arc::clone(&shutdown),
        replies: ReplyQueue::spawn(|room: Room, text: String| async move {
            send_to_room(&room, text).await
        }),
    });
    client.add_event_handler(
        move |ev: OriginalSyncRoomMessageEvent, room: Room, client: Client| {
            let handler = Arc::clone(&handler);
            async move { handler.on_message(ev, room, client).await }
        },
    );

    info!(
        timeout_ms = args.sync_timeout_ms,
        "Starting sync… Press Ctrl+C to stop."
    );
    let sync_settings = SyncSettings::new()
        .token(initial.next_batch)
        .timeout(Duration::from_millis(args.sync_timeout_ms));
    tokio::select! {
        res = client.sync(sync_settings) => res.map_err(|e| anyhow!("sync terminated: {e}")),
        () = shutdown.notified() => {
            info!("Shutting down on owner request");
            Ok(())
        }
        res = tokio::signal::ctrl_c() => {
            res.context("listening for Ctrl+C")?;
            info!("Interrupted; shutting down");
            Ok(())
        }
    }
}

fn prompt_line(label: &str) -> Result<String> {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        bail!("missing value for {:?} and stdin is not a terminal", label.trim_end_matches([':', ' ']));
    }
    let mut stderr = std::io::stderr();
    write!(stderr, "{label}")?;
    stderr.flush()?;
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    Ok(line)
}

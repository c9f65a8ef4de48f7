use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;

use vote_bot::application::errors::{BotError, ConfigError};
use vote_bot::application::messaging::PollDispatcher;
use vote_bot::application::services::{PollService, VoteService};
use vote_bot::domain::traits::Bot;
use vote_bot::infrastructure::adapters::{ConsoleAdapter, TelegramAdapter};
use vote_bot::infrastructure::config::Config;
use vote_bot::infrastructure::database::Database;

/// Pause after a failed getUpdates before polling again
const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "vote-bot")]
#[command(about = "A poll and voting bot for chat platforms", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,

    /// SQLite database path (overrides config)
    #[arg(long)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            if let Err(e) = run_bot(&cli.config, cli.token, cli.db) {
                tracing::error!("vote-bot stopped: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("vote-bot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

fn load_config(config_path: &str) -> Config {
    if !std::path::Path::new(config_path).exists() {
        return Config::load_env();
    }

    match Config::load(config_path) {
        Ok(mut config) => {
            config.apply_env();
            config
        }
        Err(e) => {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::load_env()
        }
    }
}

fn run_bot(
    config_path: &str,
    token_override: Option<String>,
    db_override: Option<PathBuf>,
) -> Result<(), BotError> {
    let mut config = load_config(config_path);
    if let Some(token) = token_override {
        config.set_token(token);
    }
    if let Some(path) = db_override {
        config.storage.path = path;
    }
    config.validate()?;

    tracing::info!("Starting vote-bot: {}", config.bot.name);

    let db = Arc::new(Database::open(&config.storage.path, config.busy_timeout())?);
    tracing::info!(path = %config.storage.path.display(), "Database initialized");

    let dispatcher = PollDispatcher::new(
        config.bot.prefix.clone(),
        PollService::new(db.clone()),
        VoteService::new(db),
    );

    let rt = tokio::runtime::Runtime::new()?;

    if let Some(token) = config.telegram_token() {
        let poll_timeout = config
            .adapters
            .telegram
            .as_ref()
            .map_or(30, |tg| tg.poll_timeout_seconds);

        rt.block_on(async {
            let mut bot = TelegramAdapter::new(token);
            run_telegram_bot(&mut bot, dispatcher, poll_timeout).await
        })?;
    } else if config.console_enabled() {
        // Run console bot (dev mode)
        let bot = ConsoleAdapter::new(&config.bot.name, &config.console());
        rt.block_on(run_console_bot(bot, &dispatcher))?;
    } else {
        return Err(BotError::Config(ConfigError::InvalidValue(
            "no adapter enabled".to_string(),
        )));
    }

    Ok(())
}

async fn run_telegram_bot(
    bot: &mut TelegramAdapter,
    dispatcher: PollDispatcher,
    poll_timeout: u64,
) -> Result<(), BotError> {
    bot.fetch_bot_info().await?;
    bot.start().await?;

    let info = bot.bot_info();
    tracing::info!("Bot started: @{}", info.username);
    let dispatcher = dispatcher.with_bot_username(info.username);

    if let Err(e) = bot.register_commands().await {
        tracing::warn!("Failed to register commands: {}", e);
    }

    let mut offset: i64 = 0;

    tracing::info!("Starting message loop...");

    loop {
        let updates = tokio::select! {
            result = bot.get_updates(offset, poll_timeout) => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                return Ok(());
            }
        };

        let updates = match updates {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!("Failed to get updates: {}", e);
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        if !updates.is_empty() {
            tracing::debug!("Received {} updates", updates.len());
        }

        // One at a time, in arrival order
        for update in &updates {
            let Some(message) = TelegramAdapter::to_message(dispatcher.parser(), update) else {
                continue;
            };
            if let Some(reply) = dispatcher.dispatch(&message).await {
                if let Err(e) = bot
                    .send_message(&reply.chat_id, &reply.text, reply.reply_to.as_deref())
                    .await
                {
                    tracing::error!(channel = %reply.chat_id, "Failed to send message: {}", e);
                }
            }
        }

        if let Some(next) = TelegramAdapter::get_next_offset(&updates) {
            offset = next;
        }
    }
}

async fn run_console_bot(
    bot: ConsoleAdapter,
    dispatcher: &PollDispatcher,
) -> Result<(), BotError> {
    bot.start().await?;

    let info = bot.bot_info();
    tracing::info!("Bot started: @{}", info.username);

    let mut stdin = BufReader::new(tokio::io::stdin());

    while let Some(input) = ConsoleAdapter::read_message(&mut stdin).await? {
        let message = bot.to_message(dispatcher.parser(), &input);
        if let Some(reply) = dispatcher.dispatch(&message).await {
            bot.send_message(&reply.chat_id, &reply.text, reply.reply_to.as_deref())
                .await?;
        }
    }

    tracing::info!("Input closed, shutting down");
    Ok(())
}

fn init_config() {
    match serde_yaml::to_string(&Config::default()) {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
        }
        Err(e) => tracing::error!("Failed to render default config: {}", e),
    }
}

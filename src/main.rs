use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;

use nology_bot::domain::entities::handler_fn;
use nology_bot::infrastructure::adapters::ConsoleAdapter;
use nology_bot::infrastructure::plugins::{
    CommandRegistry, HandlerCatalog, LoadReport, ManifestDirectory, PluginLoader, PluginWatcher,
};
use nology_bot::{BotError, Config, Dispatcher, MessageService};

#[derive(Parser)]
#[command(name = "nology-bot")]
#[command(about = "A plugin-based command bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Command prefix (overrides config)
    #[arg(short, long)]
    prefix: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot on the console transport
    Run {
        /// Conversation id console input is attributed to
        #[arg(long, default_value = "console@s.whatsapp.net")]
        chat_id: String,

        /// Treat console input as sent by the bot's own account
        #[arg(long)]
        as_self: bool,
    },
    /// Load plugins once and report what was registered
    Check,
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
    let config = load_config(&cli.config, cli.prefix);

    let result = match cli.command {
        Commands::Run { chat_id, as_self } => run_bot(config, chat_id, as_self),
        Commands::Check => check_plugins(config),
        Commands::Version => {
            println!("nology-bot v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig => init_config(),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(path: &str, prefix_override: Option<String>) -> Config {
    let mut config = if Path::new(path).exists() {
        Config::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::load_env()
        })
    } else {
        Config::load_env()
    };

    if let Some(prefix) = prefix_override {
        config.bot.prefix = prefix;
    }
    config
}

/// Handlers compiled into the binary that manifests can bind with `kind: native`
fn native_catalog(config: &Config, registry: &Arc<CommandRegistry>) -> HandlerCatalog {
    HandlerCatalog::new(config.bot.name.clone(), registry)
        .with_native(
            "ping",
            handler_fn(|message, args| async move {
                let latency = chrono::Utc::now() - message.timestamp;
                args.reply(format!("Pong! ({} ms)", latency.num_milliseconds())).await
            }),
        )
        .with_native(
            "whoami",
            handler_fn(|message, args| async move {
                args.reply(format!(
                    "{} in {}\nself: {}\nprivate: {}",
                    args.push_name, message.chat_id, args.is_bot, args.is_private
                ))
                .await
            }),
        )
}

fn build_loader(config: &Config, registry: &Arc<CommandRegistry>) -> PluginLoader {
    let source = ManifestDirectory::new(
        config.plugins.directory.clone(),
        config.plugins.extensions.clone(),
        native_catalog(config, registry),
    );
    PluginLoader::new(Arc::clone(registry), Arc::new(source))
}

fn run_bot(config: Config, chat_id: String, as_self: bool) -> Result<(), BotError> {
    config.validate()?;
    tracing::info!("Starting {}", config.bot.name);

    let registry = Arc::new(CommandRegistry::new());
    let loader = build_loader(&config, &registry);
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry), &config));

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        if let Err(e) = loader.reload().await {
            tracing::error!("Failed to load commands: {}", e);
        }

        let watcher = if config.plugins.watch {
            match PluginWatcher::spawn(loader.clone(), config.debounce()) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!("Plugin hot reload disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let transport = Arc::new(ConsoleAdapter::new(config.bot.name.clone(), chat_id).as_self(as_self));
        let result = MessageService::new(transport, dispatcher).run().await;
        if let Some(watcher) = watcher {
            watcher.stop();
        }
        result
    })
}

fn check_plugins(config: Config) -> Result<(), BotError> {
    config.validate()?;
    let registry = Arc::new(CommandRegistry::new());
    let report = build_loader(&config, &registry).load_all()?;
    print_report(&report, &registry, &config);
    println!(
        "Native handlers: {}",
        native_catalog(&config, &registry).native_names().join(", ")
    );

    if report.is_clean() {
        Ok(())
    } else {
        Err(BotError::Internal(format!("{} plugin(s) failed to load", report.failures.len())))
    }
}

fn print_report(report: &LoadReport, registry: &CommandRegistry, config: &Config) {
    println!("Plugin directory: {}", config.plugins.directory.display());
    for cmd in registry.descriptors() {
        let mut flags = Vec::new();
        if cmd.restrict_bot_sender {
            flags.push("bot-only");
        }
        if cmd.restrict_to_private {
            flags.push("private");
        }
        println!(
            "  {}{} [{}] {} {}",
            config.prefix(),
            cmd.aliases.join(", "),
            cmd.tag_text(),
            cmd.help_text(),
            flags.join(" ")
        );
    }
    for failure in &report.failures {
        println!("  FAILED {}: {}", failure.unit, failure.error);
    }
    println!(
        "{} plugin(s) loaded, {} alias(es), {} failure(s)",
        report.loaded.len(),
        report.aliases,
        report.failures.len()
    );
}

fn init_config() -> Result<(), BotError> {
    let config = Config::default();
    let yaml = serde_yaml::to_string(&config)
        .map_err(|e| BotError::Internal(format!("Failed to render config: {}", e)))?;
    println!("{}", yaml);
    println!("\nSave this to config.yaml and adjust as needed.");
    Ok(())
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::eyre;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use quickref::alarms::FileAlarms;
use quickref::browser;
use quickref::config::{self, Config};
use quickref::messages::{Dispatcher, Message, TIP_GREETING, TipRequestHandler};
use quickref::store::JsonFileStore;
use quickref::suggestions::{InstallReason, SuggestionTracker};
use quickref::tips::{HttpTipSource, TipRefresher};
use quickref::worker;

/// Chrome API quick reference
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Chrome API lookup with recency-ranked suggestions and a daily tip"
)]
struct Args {
    /// Data directory for the store and alarm registry
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed the default suggestions (first run only)
    Init,
    /// List the current suggestions, most recent first
    Suggest {
        /// Text typed so far (suggestions are recency-ranked, not filtered)
        text: Option<String>,
    },
    /// Open an API's reference docs and remember the choice
    Open {
        /// API name, e.g. "tabs" or "runtime"
        term: String,
    },
    /// Print the stored tip of the day
    Tip,
    /// Run the background refresh worker until interrupted
    Worker,
}

fn main() -> Result<()> {
    init_logging();

    color_eyre::install()?;

    // Load config early so every command sees the same settings
    let config_result = config::load_config();
    if let Some(warning) = &config_result.warning {
        log::warn!("{warning}");
    }

    let args = Args::parse();
    let data_dir = resolve_data_dir(args.data_dir)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(args.command, &config_result.config, &data_dir))
}

/// Timestamped stderr logging, INFO by default, RUST_LOG overrides
fn init_logging() {
    use std::io::Write;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::time::SystemTime;
            let datetime: chrono::DateTime<chrono::Local> = SystemTime::now().into();
            writeln!(
                buf,
                "[{}] [{}] {}",
                datetime.format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .init();
}

/// --data-dir wins; otherwise the platform data dir is used
fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    let Some(base) = dirs::data_dir() else {
        return Err(eyre!("could not determine a data directory; pass --data-dir"));
    };
    Ok(base.join("quickref"))
}

/// A data directory with no store file yet counts as a fresh install
fn install_reason(store: &JsonFileStore) -> InstallReason {
    if store.is_fresh() {
        InstallReason::Install
    } else {
        InstallReason::Update
    }
}

async fn run(command: Command, config: &Config, data_dir: &Path) -> Result<()> {
    let store = Arc::new(JsonFileStore::new(data_dir));
    let tracker = SuggestionTracker::new(store.clone());

    match command {
        Command::Init => {
            if tracker
                .initialize_defaults(install_reason(&store))
                .await?
            {
                println!("Seeded default suggestions.");
            } else {
                println!("Already initialized; keeping existing suggestions.");
            }
        }
        Command::Suggest { text } => {
            if let Some(text) = text {
                log::debug!("input {text:?} does not filter the ranking");
            }
            let set = tracker.suggestions().await;
            println!("{}", set.default_description);
            for suggestion in &set.entries {
                println!("  {:<12} {}", suggestion.content, suggestion.description);
            }
        }
        Command::Open { term } => {
            let base_url = &config.docs.base_url;
            tracker
                .confirm_selection(&term, |term| {
                    let url = browser::docs_url(base_url, term);
                    log::info!("opening {url}");
                    browser::open_docs(&url);
                })
                .await?;
        }
        Command::Tip => {
            let mut dispatcher = Dispatcher::new();
            dispatcher.register(TipRequestHandler::new(store.clone()));
            match dispatcher.dispatch(Message::new(TIP_GREETING)).await {
                Some(response) => print_tip(&response),
                None => println!("No handler answered the tip request."),
            }
        }
        Command::Worker => run_worker(config, data_dir, store, &tracker).await?,
    }

    Ok(())
}

/// Bring up the refresher and service alarm firings until Ctrl+C
async fn run_worker(
    config: &Config,
    data_dir: &Path,
    store: Arc<JsonFileStore>,
    tracker: &SuggestionTracker<JsonFileStore>,
) -> Result<()> {
    // Worker startup doubles as the install hook
    if tracker
        .initialize_defaults(install_reason(&store))
        .await?
    {
        log::info!("fresh install: seeded default suggestions");
    }

    let alarms = FileAlarms::new(data_dir);
    let source = HttpTipSource::new(config.tips.feed_url.clone());
    let refresher = TipRefresher::new(store, source, config.tips.schedule());

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("interrupt received, shutting down");
            signal_cancel.cancel();
        }
    });

    worker::run(refresher, alarms, cancel).await?;
    Ok(())
}

/// Render the dispatcher's `{"tip": ...}` reply for the terminal
fn print_tip(response: &Value) {
    match response.get("tip") {
        Some(Value::Null) | None => {
            println!("No tip stored yet. Run `quickref worker` once to fetch one.");
        }
        Some(Value::String(text)) => println!("{text}"),
        Some(other) => match serde_json::to_string_pretty(other) {
            Ok(pretty) => println!("{pretty}"),
            Err(_) => println!("{other}"),
        },
    }
}

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use serde_json::json;
use whispa_core::{
    AppAction, AppReconciler, AppState, AppUpdate, ChatHistory, FfiApp, MessageSender, Region,
};

#[derive(Debug, Parser)]
#[command(name = "whispa-cli")]
#[command(about = "Drive the Whispa chat core from a terminal")]
struct Cli {
    /// Data directory (config and log file live here)
    #[arg(long, env = "WHISPA_DATA_DIR", default_value = ".whispa-cli")]
    data_dir: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the default whispa_config.json
    Config,

    /// List matching regions
    Regions,

    /// Scripted run: match a simulated stranger, chat, stop, print history
    Demo {
        /// Messages to send before stopping
        #[arg(long, default_value_t = 3)]
        messages: u32,

        /// Give up after this many seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },

    /// Interactive chat against simulated strangers (type /help)
    Chat {
        /// Region slug or label
        #[arg(long)]
        region: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.cmd {
        Command::Config => {
            println!("{}", whispa_core::default_config_json());
            Ok(())
        }
        Command::Regions => cmd_regions(),
        Command::Demo { messages, timeout } => {
            cmd_demo(&cli, *messages, Duration::from_secs(*timeout))
        }
        Command::Chat { region } => cmd_chat(&cli, region.as_deref()),
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn print(v: serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(&v).unwrap_or_else(|_| v.to_string())
    );
}

fn open_app(cli: &Cli) -> anyhow::Result<Arc<FfiApp>> {
    std::fs::create_dir_all(&cli.data_dir)
        .with_context(|| format!("create data dir {}", cli.data_dir.display()))?;
    let data_dir = cli
        .data_dir
        .to_str()
        .ok_or_else(|| anyhow!("data dir is not valid UTF-8"))?
        .to_string();
    // The CLI always talks to simulated strangers.
    let config_path = cli.data_dir.join("whispa_config.json");
    if !config_path.exists() {
        let mut config: serde_json::Value =
            serde_json::from_str(&whispa_core::default_config_json())
                .context("parse default config")?;
        config["simulate_matches"] = json!(true);
        std::fs::write(&config_path, serde_json::to_vec_pretty(&config)?)
            .with_context(|| format!("write {}", config_path.display()))?;
    }
    Ok(FfiApp::new(data_dir))
}

fn wait_for(
    app: &FfiApp,
    what: &str,
    timeout: Duration,
    f: impl Fn(&AppState) -> bool,
) -> anyhow::Result<AppState> {
    let start = Instant::now();
    loop {
        let state = app.state();
        if f(&state) {
            return Ok(state);
        }
        if start.elapsed() >= timeout {
            return Err(anyhow!("timed out waiting for {what}"));
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}

fn history_json(entry: &ChatHistory) -> serde_json::Value {
    json!({
        "id": entry.id,
        "stranger": entry.stranger_name,
        "region": entry.stranger_region.label(),
        "messages": entry.message_count,
        "duration": whispa_core::format_chat_duration(entry.duration_secs),
        "ended_by": format!("{:?}", entry.ended_by),
        "became_friend": entry.became_friend,
    })
}

// ── Commands ────────────────────────────────────────────────────────────────

fn cmd_regions() -> anyhow::Result<()> {
    let regions: Vec<_> = Region::ALL
        .iter()
        .map(|r| json!({ "slug": r.slug(), "label": r.label() }))
        .collect();
    print(json!({ "regions": regions }));
    Ok(())
}

fn cmd_demo(cli: &Cli, messages: u32, timeout: Duration) -> anyhow::Result<()> {
    let app = open_app(cli)?;

    app.dispatch(AppAction::FindStranger);
    let state = wait_for(&app, "a match", timeout, |s| s.active_session_id.is_some())?;
    let session = state
        .active_session()
        .ok_or_else(|| anyhow!("no active session"))?
        .clone();
    eprintln!(
        "matched with {} {} ({})",
        session.participant.avatar,
        session.participant.name,
        session.participant.region.label()
    );

    for i in 1..=messages {
        app.dispatch(AppAction::SendMessage {
            session_id: session.id.clone(),
            text: format!("message {i}"),
        });
    }
    wait_for(&app, "messages", timeout, |s| {
        s.active_session()
            .is_some_and(|c| c.messages.len() as u32 >= messages)
    })?;

    app.dispatch(AppAction::StopChat {
        session_id: session.id.clone(),
    });
    wait_for(&app, "confirmation", timeout, |s| {
        s.confirmation.pending().is_some()
    })?;
    app.dispatch(AppAction::ConfirmPending);
    let state = wait_for(&app, "archive", timeout, |s| !s.history.is_empty())?;

    let stats = &state.history_stats;
    print(json!({
        "history": state.history.iter().map(history_json).collect::<Vec<_>>(),
        "stats": {
            "total_chats": stats.total_chats,
            "average_duration": whispa_core::format_chat_duration(stats.average_duration_secs),
            "ended_by_you_percent": stats.ended_by_you_percent,
            "friends_made": stats.friends_made,
        },
    }));
    Ok(())
}

#[derive(Default)]
struct PrintReconciler {
    // Toasts persist across snapshots until cleared; only print each once.
    last_toast: Mutex<Option<String>>,
}

impl AppReconciler for PrintReconciler {
    fn reconcile(&self, update: AppUpdate) {
        match update {
            AppUpdate::MatchFound { .. } => println!("* matched! say hi"),
            AppUpdate::FullState(state) => {
                let mut last = match self.last_toast.lock() {
                    Ok(g) => g,
                    Err(poison) => poison.into_inner(),
                };
                if state.toast.is_some() && *last != state.toast {
                    println!("! {}", state.toast.as_deref().unwrap_or_default());
                }
                *last = state.toast.clone();
                if let Some(action) = state.confirmation.pending() {
                    println!("? confirm {} with /yes or /no", action.tag());
                }
            }
        }
    }
}

const HELP: &str = "\
/find            look for a stranger
/skip            skip the current stranger
/stop            end the current chat
/friend          send a friend request
/wait <15|30|60|forever>
/history         list past chats
/yes /no         answer a confirmation
/quit";

fn cmd_chat(cli: &Cli, region: Option<&str>) -> anyhow::Result<()> {
    let app = open_app(cli)?;
    app.listen_for_updates(Box::new(PrintReconciler::default()));

    if let Some(raw) = region {
        let region = whispa_core::parse_region(raw.to_string())
            .ok_or_else(|| anyhow!("unknown region: {raw}"))?;
        app.dispatch(AppAction::UpdateRegion { region });
    }
    println!("{HELP}");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("read stdin")?;
        let line = line.trim();
        let active = app.state().active_session_id.clone();
        match line.split_once(' ').unwrap_or((line, "")) {
            ("/quit", _) => break,
            ("/help", _) => println!("{HELP}"),
            ("/find", _) => app.dispatch(AppAction::FindStranger),
            ("/skip", _) => app.dispatch(AppAction::SkipStranger),
            ("/yes", _) => app.dispatch(AppAction::ConfirmPending),
            ("/no", _) => app.dispatch(AppAction::CancelPending),
            ("/stop", _) => match active {
                Some(session_id) => app.dispatch(AppAction::StopChat { session_id }),
                None => println!("no open chat"),
            },
            ("/friend", _) => match active {
                Some(session_id) => app.dispatch(AppAction::SendFriendRequest { session_id }),
                None => println!("no open chat"),
            },
            ("/wait", arg) => match arg.trim() {
                "forever" => app.dispatch(AppAction::UpdateWaitTime {
                    wait_time_secs: None,
                }),
                secs => match secs.parse::<u32>() {
                    Ok(secs) => app.dispatch(AppAction::UpdateWaitTime {
                        wait_time_secs: Some(secs),
                    }),
                    Err(_) => println!("wait time must be a number or 'forever'"),
                },
            },
            ("/history", _) => {
                for entry in app.state().history.iter().rev() {
                    print(history_json(entry));
                }
            }
            _ if line.starts_with('/') => println!("unknown command, try /help"),
            _ => match active {
                Some(session_id) => {
                    app.dispatch(AppAction::SendMessage {
                        session_id,
                        text: line.to_string(),
                    });
                }
                None => println!("no open chat, /find someone first"),
            },
        }
    }

    let state = app.state();
    if let Some(session) = state.active_session() {
        for msg in &session.messages {
            let who = match msg.sender {
                MessageSender::Me => "you",
                MessageSender::Peer => session.participant.name.as_str(),
            };
            println!("{who}: {}", msg.text);
        }
    }
    Ok(())
}

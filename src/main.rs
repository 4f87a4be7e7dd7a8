mod ui;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::KeyEventKind,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    io::{self, stdin, Write},
    path::PathBuf,
    sync::{mpsc::Sender, Arc},
    time::Duration,
};

use studybuddy::{
    ai::{ChatCollaborator, GeminiClient},
    app::App,
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    daily::{self, DailySelector},
    history::{self, SessionStore},
    logging,
    models::LearningLevel,
    preferences::Preferences,
    runtime::{AppEvent, AppEventSource, CrosstermEventSource, FixedTicker, Runner, Ticker},
    storage::{KeyValueStore, SqliteStore},
    tutor::{PendingRequest, Tutor},
};

const TICK_RATE_MS: u64 = 100;

/// a terminal study companion powered by Gemini
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Study Buddy: pick a topic and a level, and an AI tutor explains it, simplifies it, quizzes you and translates the hard words. Sessions are saved locally."
)]
pub struct Cli {
    /// directory holding the study store and logs
    #[clap(long, global = true)]
    data_dir: Option<PathBuf>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// open the interactive tutor (default)
    Study {
        /// start straight away on this topic
        #[clap(short, long)]
        topic: Option<String>,

        /// learning level for the session
        #[clap(short, long, value_enum)]
        level: Option<LearningLevel>,
    },
    /// print the suggested topics of the day
    Topics {
        /// how many topics to print
        #[clap(short, long)]
        count: Option<usize>,

        /// day to pick topics for (YYYY-MM-DD), defaults to today
        #[clap(short, long)]
        date: Option<NaiveDate>,
    },
    /// print the bonus tip of the day
    Tip {
        /// day to pick the tip for (YYYY-MM-DD), defaults to today
        #[clap(short, long)]
        date: Option<NaiveDate>,
    },
    /// inspect or clear saved study sessions
    History {
        #[clap(subcommand)]
        action: HistoryCommand,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum HistoryCommand {
    /// list sessions, most recent first
    List,
    /// delete all saved sessions
    Clear,
    /// print the key points of a session
    KeyPoints {
        /// session id as shown by `history list`
        id: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let state_dir = AppDirs::resolve_state_dir(cli.data_dir.as_deref());
    let _log_guard =
        logging::init(&AppDirs::log_dir(&state_dir)).context("failed to set up logging")?;

    let config_store = FileConfigStore::new();
    let config = config_store.load();
    tracing::debug!(path = %config_store.path().display(), "loaded config");
    let db_path = AppDirs::db_path(&state_dir);
    let store: Arc<dyn KeyValueStore> = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("failed to open store at {}", db_path.display()))?,
    );

    let command = cli.command.clone().unwrap_or(Command::Study {
        topic: None,
        level: None,
    });
    let mut stdout = io::stdout().lock();

    match command {
        Command::Topics { count, date } => {
            let selector = DailySelector::new(store);
            let count = count.unwrap_or(config.suggested_topic_count);
            print_topics(&mut stdout, &selector, date.unwrap_or_else(daily::today), count)?;
        }
        Command::Tip { date } => {
            let selector = DailySelector::new(store);
            print_tip(&mut stdout, &selector, date.unwrap_or_else(daily::today))?;
        }
        Command::History { action } => {
            run_history(&mut stdout, &SessionStore::new(store), action)?;
        }
        Command::Study { topic, level } => {
            drop(stdout);
            run_study(&config, store, topic, level)?;
        }
    }

    Ok(())
}

fn print_topics(
    out: &mut impl Write,
    selector: &DailySelector,
    date: NaiveDate,
    count: usize,
) -> io::Result<()> {
    for (idx, topic) in selector.suggested_topics(date, count).iter().enumerate() {
        writeln!(out, "{}. {topic}", idx + 1)?;
    }
    Ok(())
}

fn print_tip(out: &mut impl Write, selector: &DailySelector, date: NaiveDate) -> io::Result<()> {
    match selector.daily_tip(date) {
        Some(tip) => writeln!(out, "{tip}"),
        None => writeln!(out, "No tip today."),
    }
}

fn run_history(
    out: &mut impl Write,
    sessions: &SessionStore,
    action: HistoryCommand,
) -> anyhow::Result<()> {
    match action {
        HistoryCommand::List => {
            let all = sessions.get_all();
            if all.is_empty() {
                writeln!(out, "No study sessions yet.")?;
            }
            for s in history::sorted_by_recent(&all) {
                let when = s
                    .last_accessed_local()
                    .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                writeln!(
                    out,
                    "{}  {when}  {:<8}  {}  ({} messages)",
                    s.id,
                    s.learning_level,
                    s.topic,
                    s.chat_history.len()
                )?;
            }
        }
        HistoryCommand::Clear => {
            sessions.clear();
            writeln!(out, "Study history cleared.")?;
        }
        HistoryCommand::KeyPoints { id } => {
            let all = sessions.get_all();
            let Some(session) = history::find(&all, &id) else {
                bail!("no study session with id {id}");
            };
            let mut points: Vec<_> = session.chat_history.iter().filter(|m| m.is_key_point).collect();
            points.sort_by_key(|m| m.id);
            if points.is_empty() {
                writeln!(out, "No key points saved for \"{}\".", session.topic)?;
            }
            for m in points {
                let text = m
                    .text
                    .as_deref()
                    .or(m.practice_problem.as_ref().map(|p| p.question.as_str()))
                    .unwrap_or_default();
                writeln!(out, "★ {text}")?;
            }
        }
    }
    Ok(())
}

fn run_study(
    config: &Config,
    store: Arc<dyn KeyValueStore>,
    topic: Option<String>,
    level: Option<LearningLevel>,
) -> anyhow::Result<()> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let client = GeminiClient::from_config(config).context("failed to set up the AI client")?;
    tracing::info!(model = client.model(), "AI client initialized");
    let collaborator: Arc<dyn ChatCollaborator> = Arc::new(client);
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let today = daily::today();
    let selector = DailySelector::new(store.clone());
    let tutor = Tutor::new(collaborator, SessionStore::new(store.clone()));
    let mut app = App::new(
        tutor,
        Preferences::new(store),
        level.unwrap_or(config.default_level),
        selector.suggested_topics(today, config.suggested_topic_count),
        selector.daily_tip(today).map(str::to_string),
    );

    let initial = topic.and_then(|t| {
        app.overlay = None;
        app.start_topic(&t)
    });

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let result = start_tui(&mut terminal, &mut app, &runner, rt.handle(), initial);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Run `pending` on the async runtime and post the reply back to the UI loop
fn spawn_request(rt: &tokio::runtime::Handle, tx: &Sender<AppEvent>, pending: PendingRequest) {
    let tx = tx.clone();
    rt.spawn(async move {
        let reply = pending.run().await;
        if tx.send(AppEvent::Reply(reply)).is_err() {
            tracing::debug!("UI closed before reply arrived");
        }
    });
}

fn start_tui<B: Backend, E: AppEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
    rt: &tokio::runtime::Handle,
    initial: Option<PendingRequest>,
) -> anyhow::Result<()> {
    let tx = runner.sender();
    if let Some(pending) = initial {
        spawn_request(rt, &tx, pending);
    }

    terminal.draw(|f| ui::draw(app, f))?;

    loop {
        match runner.step() {
            AppEvent::Tick => {
                // only the spinner animates
                if app.is_loading() {
                    app.on_tick();
                    terminal.draw(|f| ui::draw(app, f))?;
                }
            }
            AppEvent::Resize => {
                terminal.draw(|f| ui::draw(app, f))?;
            }
            AppEvent::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(pending) = app.on_key(key) {
                    spawn_request(rt, &tx, pending);
                }
                if app.should_quit {
                    break;
                }
                terminal.draw(|f| ui::draw(app, f))?;
            }
            AppEvent::Reply(reply) => {
                app.on_reply(reply);
                terminal.draw(|f| ui::draw(app, f))?;
            }
        }
    }

    Ok(())
}

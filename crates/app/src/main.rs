use std::cell::RefCell;
use std::fmt;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use quiz_core::model::SessionConfig;
use services::sessions::{
    AnswerStatus, NavigationAttempt, NavigationDecision, Navigator, TracingSink,
};
use services::{
    Clock, ExitMethod, NavigationRegistry, SessionLoopService, SessionPhase, SkipKind, Telemetry,
    TestSession,
};
use storage::json::load_bank;
use storage::repository::{QuestionBank, Storage};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidSeed { raw: String },
    MissingBank,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidSeed { raw } => write!(f, "invalid --seed value: {raw}"),
            ArgsError::MissingBank => write!(f, "no question bank given (--bank or QUIZ_BANK_PATH)"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- run    --bank <file.json> [--mode <mode>] [--target <id>]");
    eprintln!("                             [--seed <n>] [--no-telemetry]");
    eprintln!("  cargo run -p app -- topics --bank <file.json>");
    eprintln!();
    eprintln!("Modes:");
    eprintln!("  topic, topic-quick        (target: topic id, e.g. 2.3)");
    eprintln!("  domain, domain-quick      (target: domain id, e.g. 2)");
    eprintln!("  full-exam, quick-exam, super-quick-exam");
    eprintln!();
    eprintln!("Defaults for run:");
    eprintln!("  --mode quick-exam");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_BANK_PATH, QUIZ_MODE, QUIZ_TARGET, QUIZ_SEED, QUIZ_TELEMETRY, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    Topics,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "topics" => Some(Self::Topics),
            _ => None,
        }
    }
}

struct Args {
    bank: PathBuf,
    mode: String,
    target: Option<String>,
    seed: Option<u64>,
    telemetry: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let mut bank = env("QUIZ_BANK_PATH").map(PathBuf::from);
        let mut mode = env("QUIZ_MODE").unwrap_or_else(|| "quick-exam".into());
        let mut target = env("QUIZ_TARGET");
        let mut seed = env("QUIZ_SEED").map(|raw| parse_seed(&raw)).transpose()?;
        let mut telemetry = env("QUIZ_TELEMETRY")
            .is_none_or(|raw| !matches!(raw.trim(), "0" | "false" | "off" | "no"));

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--bank" => bank = Some(PathBuf::from(require_value(args, "--bank")?)),
                "--mode" => mode = require_value(args, "--mode")?,
                "--target" => target = Some(require_value(args, "--target")?),
                "--seed" => seed = Some(parse_seed(&require_value(args, "--seed")?)?),
                "--no-telemetry" => telemetry = false,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            bank: bank.ok_or(ArgsError::MissingBank)?,
            mode,
            target,
            seed,
            telemetry,
        })
    }
}

fn parse_seed(raw: &str) -> Result<u64, ArgsError> {
    raw.trim().parse().map_err(|_| ArgsError::InvalidSeed {
        raw: raw.to_string(),
    })
}

/// Stand-in for a router: prints where the host would go.
struct TerminalNavigator {
    location: RefCell<String>,
}

impl TerminalNavigator {
    fn at(location: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            location: RefCell::new(location.into()),
        })
    }
}

impl Navigator for TerminalNavigator {
    fn current_location(&self) -> String {
        self.location.borrow().clone()
    }

    fn replace_location(&self, location: &str) {
        *self.location.borrow_mut() = location.to_string();
    }

    fn navigate(&self, destination: &str) {
        *self.location.borrow_mut() = destination.to_string();
        println!("-> {destination}");
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Run,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Run,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let parsed = Args::parse(&mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::from_bank(load_bank(&parsed.bank)?);
    tracing::info!(bank = %parsed.bank.display(), "question bank loaded");

    match cmd {
        Command::Topics => list_topics(storage.questions.as_ref()).await,
        Command::Run => {
            let config = SessionConfig::parse(&parsed.mode, parsed.target.as_deref())?;
            let telemetry = Telemetry::new(Arc::new(TracingSink));
            if !parsed.telemetry {
                telemetry.disable();
            }

            let mut service = SessionLoopService::new(Clock::system(), Arc::clone(&storage.questions))
                .with_telemetry(telemetry);
            if let Some(seed) = parsed.seed {
                service = service.with_seed(seed);
            }

            let location = format!("/test/{}", config.mode().as_str());
            let session = service
                .start_session(config)
                .await?
                .with_default_leave(|| println!("-> /"));
            drive(&service, session, TerminalNavigator::at(location)).await
        }
    }
}

async fn list_topics(bank: &dyn QuestionBank) -> Result<(), Box<dyn std::error::Error>> {
    for (domain, count) in bank.domain_counts().await? {
        println!("domain {domain}: {count} questions");
    }
    for topic in bank.topics().await? {
        println!("  {topic}");
    }
    Ok(())
}

/// Terminal session loop. Mirrors what a UI host does: register the
/// interceptor, render after every input, tear down on exit.
async fn drive(
    service: &SessionLoopService,
    session: TestSession,
    navigator: Rc<TerminalNavigator>,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Rc::new(RefCell::new(session));
    let mut registry = NavigationRegistry::new(navigator);
    registry.register(&session);

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        if session.borrow().is_terminated() {
            break;
        }
        render(&session.borrow());
        prompt(session.borrow().phase())?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let input = line.trim();

        let phase = session.borrow().phase();
        match (phase, input) {
            (SessionPhase::ExitPending, "y") => {
                service.confirm_exit_and_wait(&session).await;
            }
            (SessionPhase::ExitPending, "n") => {
                session.borrow_mut().cancel_exit();
            }
            (SessionPhase::Results, "r") => {
                session.borrow_mut().restart();
            }
            (SessionPhase::Results, "q") => break,
            (SessionPhase::Active, "s") => match session.borrow_mut().skip() {
                Some(SkipKind::Defer) => println!("Deferred to the end."),
                Some(SkipKind::Forfeit) => println!("Skipped."),
                None => {}
            },
            (SessionPhase::Active, "q") => {
                session.borrow_mut().request_exit(ExitMethod::UiButton, None);
            }
            (_, "b") => {
                let decision = registry.attempt(NavigationAttempt::new(ExitMethod::BrowserBack, "/"));
                if decision == NavigationDecision::Proceed {
                    break;
                }
            }
            (SessionPhase::Active, raw) => match raw.parse::<usize>() {
                Ok(choice) if choice > 0 => {
                    if let Some(record) = service.submit_and_advance(&session, Some(choice - 1)).await {
                        println!("{}", if record.is_correct { "Correct." } else { "Incorrect." });
                    }
                }
                _ => println!("Enter an option number, s, q or b."),
            },
            _ => {}
        }
    }

    registry.teardown(&session);
    Ok(())
}

fn render(session: &TestSession) {
    let view = session.view();
    if let Some(modal) = view.exit_modal {
        println!();
        println!("{}", modal.title);
        println!("{}", modal.body);
        println!("[y] {}  [n] {}", modal.confirm_label, modal.cancel_label);
        return;
    }
    if let Some(results) = session.results() {
        println!();
        println!("Score: {}/{} ({}%)", results.score, results.total, results.percentage);
        for entry in &results.breakdown {
            let status = match entry.status {
                AnswerStatus::Correct => "correct",
                AnswerStatus::Incorrect => "incorrect",
                AnswerStatus::Forfeited => "skipped",
            };
            println!("  #{} {status}", entry.question_id);
        }
        println!("[r] Restart  [q] Quit");
        return;
    }
    let Some(question) = view.question.filter(|_| view.phase == SessionPhase::Active) else {
        return;
    };
    println!();
    println!(
        "[{}/{}] {} ({:.0}% done)",
        view.position,
        view.total,
        question.topic_id(),
        view.progress.fraction() * 100.0
    );
    println!("{}", question.prompt());
    for (i, option) in question.options().iter().enumerate() {
        println!("  {}. {option}", i + 1);
    }
    println!("[s] {}  [q] Exit test", view.skip_label.text());
}

fn prompt(phase: SessionPhase) -> std::io::Result<()> {
    if matches!(
        phase,
        SessionPhase::Active | SessionPhase::ExitPending | SessionPhase::Results
    ) {
        print!("> ");
        std::io::stdout().flush()?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("services=info,app=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

use std::fmt;
use std::io::{BufRead, Write};
use std::time::Duration;

use quiz_core::catalog::{self, Filiere};
use quiz_core::model::{QuestionDraft, QuizOutcome, ScoreTier};
use services::{AppServices, Clock, LockCause, SessionPhase, SessionRunner, SessionSnapshot};
use tokio::sync::mpsc;
use tokio::time::sleep;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidFiliere { raw: String },
    MissingModule,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidFiliere { raw } => write!(f, "unknown --filiere value: {raw}"),
            ArgsError::MissingModule => write!(f, "--module is required for this command"),
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
    eprintln!("  cargo run -p app -- quiz    --module <name> [--filiere <label>] [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- author  [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- modules");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:quiz.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_AI_API_KEY, QUIZ_AI_BASE_URL, QUIZ_AI_MODEL");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Quiz,
    Author,
    Modules,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "quiz" => Some(Self::Quiz),
            "author" => Some(Self::Author),
            "modules" => Some(Self::Modules),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    filiere: Option<Filiere>,
    module: Option<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url);
        let mut filiere = None;
        let mut module = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--filiere" => {
                    let value = require_value(args, "--filiere")?;
                    let parsed: Filiere = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidFiliere { raw: value.clone() })?;
                    filiere = Some(parsed);
                }
                "--module" => {
                    module = Some(require_value(args, "--module")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            filiere,
            module,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

//
// ─── QUIZ COMMAND ──────────────────────────────────────────────────────────────
//

fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn render_question(snapshot: &SessionSnapshot) {
    let Some(question) = &snapshot.question else {
        return;
    };
    println!();
    println!(
        "Question {}/{} — {} s",
        snapshot.question_number, snapshot.total_questions, snapshot.time_remaining
    );
    println!("{}", question.text());
    for (index, option) in question.options().iter().enumerate() {
        println!("  {}) {}", index + 1, option);
    }
    println!("Répondez par un numéro, 'p' pour passer, 's' pour signaler.");
}

fn handle_line(runner: &SessionRunner, line: &str) {
    let Some(snapshot) = runner.snapshot() else {
        return;
    };
    let input = line.trim();

    match snapshot.phase {
        SessionPhase::Active => match input {
            "p" => {
                if runner.request_skip() {
                    println!("Voulez-vous vraiment passer cette question ? (o/n)");
                }
            }
            "s" => {
                if runner.request_report() {
                    println!("Motif du signalement (ligne vide pour annuler) :");
                }
            }
            _ => {
                let Some(question) = &snapshot.question else {
                    return;
                };
                let Some(option) = input
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|idx| question.options().get(idx))
                else {
                    println!("Entrée non reconnue.");
                    return;
                };
                if runner.select_option(option) {
                    if let Some(after) = runner.snapshot() {
                        match after.phase {
                            SessionPhase::Locked(LockCause::Answered { correct: true }) => {
                                println!("Bonne réponse !");
                            }
                            SessionPhase::Locked(LockCause::Answered { correct: false }) => {
                                println!(
                                    "Mauvaise réponse. La bonne réponse était : {}",
                                    question.correct_answer()
                                );
                            }
                            _ => {}
                        }
                    }
                }
            }
        },
        SessionPhase::SkipConfirm => {
            if input == "o" {
                runner.confirm_skip();
            } else {
                runner.cancel_skip();
                println!("Question reprise.");
            }
        }
        SessionPhase::ReportDraft => {
            if input.is_empty() {
                runner.cancel_report();
                println!("Signalement annulé.");
            } else if runner.submit_report(input) {
                println!("Signalement envoyé. Merci !");
            }
        }
        SessionPhase::Locked(_) | SessionPhase::Completed => {}
    }
}

fn render_outcome(outcome: &QuizOutcome, message: &str) {
    let icon = match outcome.tier() {
        ScoreTier::High => "🏆",
        ScoreTier::Mid => "🥈",
        ScoreTier::Low => "📚",
    };
    println!();
    println!("C'est terminé ! {icon}");
    println!(
        "Module {} — score {}/{} ({}%)",
        outcome.module(),
        outcome.score(),
        outcome.total_questions(),
        outcome.percentage()
    );
    println!("\"{message}\"");
}

async fn run_quiz(services: &AppServices, filiere: Filiere, module: &str) {
    println!("Filière : {filiere} — module : {module}");

    let runner = match services.start_quiz(filiere, module).await {
        Ok(runner) => runner,
        Err(err) => {
            eprintln!("impossible de démarrer le quiz: {err}");
            return;
        }
    };

    let mut lines = spawn_stdin_reader();
    let mut printed_question = 0;
    let mut timeout_announced = 0;

    let outcome = loop {
        tokio::select! {
            outcome = runner.finished() => break outcome,
            line = lines.recv() => {
                let Some(line) = line else { break runner.finished().await };
                handle_line(&runner, &line);
            }
            () = sleep(Duration::from_millis(200)) => {
                let Some(snapshot) = runner.snapshot() else { continue };
                if snapshot.phase == SessionPhase::Active
                    && snapshot.question_number > printed_question
                {
                    printed_question = snapshot.question_number;
                    render_question(&snapshot);
                } else if snapshot.phase == SessionPhase::Locked(LockCause::TimedOut)
                    && snapshot.question_number > timeout_announced
                {
                    timeout_announced = snapshot.question_number;
                    println!("⏱ Temps écoulé !");
                }
            }
        }
    };

    let Some(outcome) = outcome else {
        eprintln!("session interrompue avant la fin");
        return;
    };
    let message = services.motivation().encouragement(&outcome).await;
    render_outcome(&outcome, &message);
}

//
// ─── AUTHOR COMMAND ────────────────────────────────────────────────────────────
//

fn prompt(label: &str) -> Result<String, std::io::Error> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn pick_module() -> Result<Option<String>, std::io::Error> {
    for (index, filiere) in Filiere::ALL.iter().enumerate() {
        println!("  {}) {}", index + 1, filiere);
    }
    let choice = prompt("Spécialisation : ")?;
    let Some(filiere) = choice
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| Filiere::ALL.get(idx))
    else {
        return Ok(None);
    };

    for (index, module) in filiere.modules().iter().enumerate() {
        println!("  {}) {}", index + 1, module);
    }
    let choice = prompt("Module cible : ")?;
    Ok(choice
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| filiere.modules().get(idx))
        .map(|module| (*module).to_owned()))
}

async fn run_author(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let module = pick_module()?;

    let text = prompt("Énoncé de la question : ")?;
    let mut options = Vec::new();
    for index in 1..=4 {
        options.push(prompt(&format!("Choix {index} (vide pour ignorer) : "))?);
    }
    let correct_answer = prompt("Réponse attendue (copie exacte) : ")?;

    let draft = QuestionDraft {
        text,
        options,
        correct_answer,
    };
    match services
        .authoring()
        .add_question(module.as_deref(), draft)
        .await
    {
        Ok(question) => {
            println!("Question ajoutée avec succès ! (id {})", question.id());
            Ok(())
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

fn run_modules() {
    for filiere in Filiere::ALL {
        println!("{filiere}");
        for module in filiere.modules() {
            let marker = if catalog::builtin_questions(module).is_some() {
                "•"
            } else {
                "·"
            };
            println!("  {marker} {module}");
        }
    }
}

//
// ─── ENTRY POINT ───────────────────────────────────────────────────────────────
//

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    argv.remove(0);

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    if cmd == Command::Modules {
        run_modules();
        return Ok(());
    }

    // Open + migrate SQLite at startup. Keep this in the binary glue so
    // core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(&parsed.db_url, Clock::default_clock()).await?;

    match cmd {
        Command::Quiz => {
            let module = parsed.module.ok_or(ArgsError::MissingModule)?;
            let filiere = match parsed.filiere.or_else(|| catalog::filiere_of(&module)) {
                Some(filiere) => filiere,
                None => {
                    eprintln!("unknown module: pass --filiere to place it");
                    return Err(ArgsError::MissingModule.into());
                }
            };
            run_quiz(&services, filiere, &module).await;
            Ok(())
        }
        Command::Author => run_author(&services).await,
        Command::Modules => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

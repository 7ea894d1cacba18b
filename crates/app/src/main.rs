use std::fmt;
use std::io::{self, BufRead, Write};

use hinter_core::Clock;
use services::{
    ApiConfig, AppServices, Approach, GenerationOptions, SelectOutcome, SessionPhase,
};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidApproach { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidApproach { raw } => {
                write!(f, "invalid --approach value: {raw} (naive|optimized|both)")
            }
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
    eprintln!("  cargo run -p app -- [--api <url>] [--approach <naive|optimized|both>] [--difficulty <level>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --api http://localhost:8000");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  HINTER_API_URL");
}

struct Args {
    api_url: String,
    options: GenerationOptions,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut api_url =
            std::env::var("HINTER_API_URL").unwrap_or_else(|_| "http://localhost:8000".into());
        let mut options = GenerationOptions::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--api" => {
                    api_url = require_value(args, "--api")?;
                }
                "--approach" => {
                    let value = require_value(args, "--approach")?;
                    options.approach = Some(parse_approach(&value)?);
                }
                "--difficulty" => {
                    options.difficulty = Some(require_value(args, "--difficulty")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { api_url, options })
    }
}

fn parse_approach(raw: &str) -> Result<Approach, ArgsError> {
    match raw {
        "naive" => Ok(Approach::Naive),
        "optimized" => Ok(Approach::Optimized),
        "both" => Ok(Approach::Both),
        _ => Err(ArgsError::InvalidApproach { raw: raw.into() }),
    }
}

fn prompt(text: &str) -> Option<String> {
    print!("{text}");
    io::stdout().flush().ok()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).ok()? == 0 {
        return None;
    }
    Some(line.trim().to_owned())
}

async fn walk_session(services: &AppServices) {
    let workflow = services.workflow();
    let step_links = services.step_links();

    loop {
        let snapshot = workflow.snapshot().await;
        match snapshot.phase {
            SessionPhase::Active => {}
            SessionPhase::Completed => {
                let progress = snapshot.progress;
                println!(
                    "\nDone! {} of {} steps completed.",
                    progress.completed, progress.total
                );
                return;
            }
            SessionPhase::Idle | SessionPhase::Loading => return,
        }

        let Some(step) = snapshot.current_step else {
            return;
        };

        println!(
            "\nStep {} of {}: {}",
            snapshot.current_index + 1,
            snapshot.progress.total,
            step.title()
        );
        if !step.description().is_empty() {
            println!("{}", step.description());
        }
        for (index, option) in step.options().iter().enumerate() {
            println!("  {}. {}", index + 1, option.label());
        }

        let Some(input) = prompt("Choose an option (number, blank to stop): ") else {
            return;
        };
        if input.is_empty() {
            return;
        }
        let Some(option) = input
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| step.options().get(idx))
        else {
            println!("Pick a number between 1 and {}.", step.options().len());
            continue;
        };

        match workflow.select_choice(step.id(), option.id()).await {
            SelectOutcome::Correct { .. } => {
                println!("Correct! {}", option.reason().unwrap_or("Nice pick."));
                if let Some(problem) = &snapshot.problem {
                    let links = step_links.links_for_step(problem, &step).await;
                    if !links.is_empty() {
                        println!("Further reading:");
                        for link in links {
                            println!("  - {} ({})", link.title, link.url);
                        }
                    }
                }
            }
            SelectOutcome::Incorrect => {
                let snapshot = workflow.snapshot().await;
                if let Some(error) = snapshot.last_error {
                    println!("Not quite: {error}");
                }
                workflow.clear_error().await;
            }
            SelectOutcome::Rejected(err) => {
                println!("{err}");
                workflow.clear_error().await;
            }
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut raw_args = std::env::args().skip(1);
    let args = match Args::parse(&mut raw_args) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            std::process::exit(2);
        }
    };

    let services = AppServices::new(ApiConfig::new(args.api_url), Clock::default());
    let workflow = services.workflow();

    loop {
        let Some(problem) = prompt("\nDescribe a problem (blank to quit): ") else {
            break;
        };
        if problem.is_empty() {
            break;
        }

        println!("Generating steps...");
        workflow.submit(&problem, &args.options).await;

        let snapshot = workflow.snapshot().await;
        if let Some(error) = &snapshot.last_error {
            println!("{error}");
            workflow.clear_error().await;
            continue;
        }
        if let Some(warning) = &snapshot.warning {
            println!("Note: {warning}");
        }

        walk_session(&services).await;
        workflow.reset().await;
        services.step_links().clear().await;
    }
}

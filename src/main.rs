use clap::{ArgAction, Parser};
use std::process::ExitCode;

use class_decorators::scenarios::{self, SCENARIOS, Scenario};

#[derive(Parser)]
#[command(
    name = "class-decorators",
    version,
    about = "Run class decoration scenarios and print their transcripts"
)]
struct Cli {
    /// Scenario to run; all of them when omitted
    scenario: Option<String>,

    /// List the available scenarios
    #[arg(short, long)]
    list: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn run_one(scenario: &Scenario) -> bool {
    println!("== {}", scenario.name);
    match scenario.run() {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            true
        }
        Err(e) => {
            eprintln!("{}: {e}", scenario.name);
            false
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.list {
        for scenario in SCENARIOS {
            println!("{:<22} {}", scenario.name, scenario.description);
        }
        return ExitCode::SUCCESS;
    }

    let ok = match &cli.scenario {
        Some(name) => match scenarios::find(name) {
            Ok(scenario) => run_one(scenario),
            Err(e) => {
                eprintln!("{e}");
                false
            }
        },
        None => SCENARIOS.iter().fold(true, |ok, s| run_one(s) && ok),
    };

    if ok { ExitCode::SUCCESS } else { ExitCode::from(1) }
}

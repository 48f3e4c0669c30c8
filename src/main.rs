//! Claude Code hook rule engine.
//!
//! Reads one hook event from stdin, runs the rules configured for its
//! category and prints the merged verdict.

use std::io::{self, Read};
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cc_hook_rules::cli::Cli;
use cc_hook_rules::event::sniff_category;
use cc_hook_rules::{
    ActionExecutor, Category, Config, ConfigError, Dispatch, Dispatcher, Event, EventError,
    QueryCache, ShellRunner,
};

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .with_writer(io::stderr)
        .init();

    let code = if cli.check {
        check(&cli)
    } else {
        match run(&cli) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {e}");
                1
            }
        }
    };
    process::exit(code);
}

/// `--check`: validate the config and report every problem.
fn check(cli: &Cli) -> i32 {
    let Some((path, _)) = cli.config_path() else {
        eprintln!("Error: cannot determine a config path; pass --config");
        return 1;
    };
    match Config::load(&path) {
        Ok(config) => {
            let problems = config.validate();
            if !problems.is_empty() {
                for problem in &problems {
                    eprintln!("{}: {problem}", path.display());
                }
                return 1;
            }
            println!(
                "{}: OK ({} rule(s))",
                path.display(),
                config.rule_count()
            );
            0
        }
        Err(ConfigError::Invalid(problems)) => {
            for problem in &problems {
                eprintln!("{}: {problem}", path.display());
            }
            1
        }
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}

fn run(cli: &Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;

    let category = match cli.event {
        Some(category) => category,
        None => sniff_category(&input).ok_or_else(|| {
            Event::parse(&input, None)
                .err()
                .unwrap_or(EventError::MissingCategory)
        })?,
    };

    let (dispatch, structured) = match load_config(cli) {
        Ok(config) => (
            evaluate(&config, category, &input),
            config.settings.structured_output,
        ),
        Err(e) => (fail_safe(category, &e.to_string()), true),
    };

    if let Some(error) = &dispatch.error {
        for line in error.lines() {
            eprintln!("Warning: {line}");
        }
    }

    if structured {
        println!("{}", serde_json::to_string(&dispatch.output)?);
        return Ok(0);
    }

    // Legacy mode: the verdict travels in the exit code
    if let Some(exit) = &dispatch.exit_override {
        if exit.code == 0 {
            println!("{}", exit.message);
        } else {
            eprintln!("{}", exit.message);
        }
        return Ok(exit.code);
    }
    if dispatch.blocked {
        eprintln!("{}", dispatch.reason);
        return Ok(2);
    }
    Ok(0)
}

fn load_config(cli: &Cli) -> Result<Config, ConfigError> {
    match cli.config_path() {
        Some((path, true)) => Config::load(&path),
        Some((path, false)) => Config::load_or_default(&path),
        None => Ok(Config::default()),
    }
}

fn evaluate(config: &Config, category: Category, input: &str) -> Dispatch {
    let event = match Event::parse(input, Some(category)) {
        Ok(event) => event,
        Err(e) => return fail_safe(category, &e.to_string()),
    };
    let rules = config.rules(category);
    if rules.is_empty() {
        tracing::debug!(%category, "no rules configured");
    }

    let runner = match ShellRunner::new(config.settings.shell.as_str()) {
        Ok(runner) => runner,
        Err(e) => return fail_safe(category, &format!("failed to start runtime: {e}")),
    };
    let executor = ActionExecutor::new(Arc::new(QueryCache::default()), Box::new(runner))
        .with_default_timeout(config.settings.command_timeout());

    Dispatcher::new(rules, &executor).dispatch(&event)
}

fn fail_safe(category: Category, error: &str) -> Dispatch {
    eprintln!("Warning: {error}");
    Dispatch::fail_safe(category.policy(), error)
}

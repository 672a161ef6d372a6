use anyhow::{Context, Result};
use argh::FromArgs;
use dzlang::Interpreter;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Run DZLang programs, one command per line.
struct Args {
    /// run the commands of a script file
    #[argh(option, short = 'f')]
    file: Option<PathBuf>,

    /// load a saved state file before running anything
    #[argh(option, short = 's')]
    state: Option<PathBuf>,

    /// log every dispatched command to stderr
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// commands to run in order, e.g. "let x = 1" "print x"
    #[argh(positional, greedy)]
    commands: Vec<String>,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("dzlang=debug")
    } else {
        EnvFilter::try_from_env("DZLANG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_output(output: Option<String>) {
    if let Some(text) = output {
        println!("{text}");
    }
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();
    init_logging(args.verbose);

    let mut dz = Interpreter::default();

    if let Some(state) = &args.state {
        print_output(dz.execute(&format!("load {}", state.display())));
    }

    if let Some(file) = &args.file {
        let source = std::fs::read_to_string(file)
            .with_context(|| format!("cannot read script {}", file.display()))?;
        info!(script = %file.display(), "running script");
        for line in source.lines() {
            print_output(dz.execute(line));
            if dz.should_exit() {
                return Ok(());
            }
        }
    }

    for command in &args.commands {
        print_output(dz.execute(command));
        if dz.should_exit() {
            return Ok(());
        }
    }

    if args.file.is_none() && args.commands.is_empty() {
        debug!("starting interactive session");
        dz.repl().context("interactive session failed")?;
    }

    Ok(())
}

mod backtest;
mod common;
mod optimize;
mod report;
mod validate;

use std::path::PathBuf;

pub enum Command {
    Backtest {
        config: PathBuf,
        out: Option<PathBuf>,
    },
    Optimize {
        config: PathBuf,
    },
    Validate {
        config: PathBuf,
        strict: bool,
    },
    Report {
        input: PathBuf,
    },
}

pub fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Backtest { config, out } => backtest::run(config, out),
        Command::Optimize { config } => optimize::run(config),
        Command::Validate { config, strict } => validate::run(config, strict),
        Command::Report { input } => report::run(input),
    }
}

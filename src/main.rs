use anyhow::Context;
use clap::Parser;
use shipyard::{Cli, Pipeline, SystemRunner, TerminalPrompter, logging};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let file = cli.file_config().context("cannot read config file")?;
    let log = logging::init(&cli.log_dir(&file)).context("cannot open log file")?;

    let runner = SystemRunner::new();
    let prompter = TerminalPrompter::new();

    Pipeline::new(&runner, &prompter)
        .dispatch(&cli, &file)
        .with_context(|| format!("deployment failed, see {}", log.path().display()))?;
    Ok(())
}

use anyhow::{Context, Result};
use shello::{Args, Config, Interpreter};
use std::io::Write;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Args = argh::from_env();
    let config = Config::from(args);
    let commands = config.commands.clone();
    let mut shell = Interpreter::new(config);

    if commands.is_empty() {
        shell.repl().context("line editor failed")?;
        return Ok(());
    }

    let code = shell.run_commands(&commands);
    std::io::stdout().flush()?;
    std::process::exit(code)
}

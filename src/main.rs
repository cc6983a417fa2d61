use std::process;

use tracing_subscriber::EnvFilter;

mod command;
mod config;
mod editor;
mod error;
mod history;
mod input;
mod jobs;
mod launcher;
mod prompt;
mod redirects;
mod shell;
mod signal_handler;

use config::Config;

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let config = Config::from_env();
    init_logging(&config);
    for setting in &config.ignored {
        tracing::warn!(%setting, "ignoring invalid setting");
    }

    let mut shell = match shell::Shell::new(&config) {
        Ok(shell) => shell,
        Err(e) => {
            eprintln!("hsh: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = shell.run() {
        eprintln!("hsh: error reading input: {}", e);
        process::exit(1);
    }
}

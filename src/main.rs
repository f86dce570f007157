mod app;
mod config;
mod constants;
mod filing;
mod llms;
mod navigator;
mod queue;
mod state;
mod ui;

use std::io;
use std::path::Path;

use crossterm::{
    ExecutableCommand,
    terminal::{LeaveAlternateScreen, disable_raw_mode},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use app::Session;
use config::Config;
use constants::CONFIG_FILE;

fn main() -> io::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config_path = CONFIG_FILE.to_string();
    let mut source: Option<String> = None;
    let mut verbose = false;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                if let Some(path) = iter.next() {
                    config_path = path.clone();
                }
            }
            "--source" => source = iter.next().cloned(),
            "-v" | "--verbose" => verbose = true,
            other => {
                // a bare positional argument is the source
                if source.is_none() && !other.starts_with('-') {
                    source = Some(other.to_string());
                }
            }
        }
    }

    let config = match Config::load(Path::new(&config_path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load {}: {}", config_path, e);
            std::process::exit(1);
        }
    };

    init_logging(&config, verbose);
    install_panic_hook();

    let mut session = Session::new(config);
    session.run(source)
}

/// File-only logging by default; `-v` mirrors to stderr.
fn init_logging(config: &Config, verbose: bool) {
    if let Some(parent) = config.logging.file.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.logging.file)
    else {
        return;
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    let file_layer = fmt::layer().with_writer(std::sync::Arc::new(file)).with_ansi(false);
    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if verbose {
        let _ = registry.with(fmt::layer().with_writer(io::stderr)).try_init();
    } else {
        let _ = registry.try_init();
    }
}

/// Restore the terminal and log the panic before dying. Without this a
/// panic inside the Navigator leaves the terminal in raw mode and the
/// error is lost.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = io::stdout().execute(LeaveAlternateScreen);
        tracing::error!("panic: {}", info);
        default_hook(info);
    }));
}

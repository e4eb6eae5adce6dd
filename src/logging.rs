use anyhow::{anyhow, Context};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Where log lines go.
#[derive(Debug, Clone)]
pub enum LogSink {
    Stderr,
    /// Append to a file (used while the terminal UI owns stdout/stderr).
    File(PathBuf),
    /// Only errors, to stderr.
    ErrorsOnly,
}

fn parse_level(level: &str) -> LevelFilter {
    level.trim().parse::<LevelFilter>().unwrap_or(LevelFilter::INFO)
}

/// Install the global subscriber. `RUST_LOG` overrides `level`.
pub fn init(level: &str, sink: LogSink) -> anyhow::Result<()> {
    let default = match sink {
        LogSink::ErrorsOnly => LevelFilter::ERROR,
        _ => parse_level(level),
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();

    let (console, file) = match sink {
        LogSink::Stderr | LogSink::ErrorsOnly => (
            Some(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_filter(filter),
            ),
            None,
        ),
        LogSink::File(path) => {
            let f = File::options()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("open log file {}", path.display()))?;
            let layer = fmt::layer()
                .with_writer(Mutex::new(f))
                .with_ansi(false)
                .with_filter(filter);
            (None, Some(layer))
        }
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| anyhow!("install log subscriber: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_level_defaults_to_info() {
        assert_eq!(parse_level("debug"), LevelFilter::DEBUG);
        assert_eq!(parse_level("loud"), LevelFilter::INFO);
    }
}

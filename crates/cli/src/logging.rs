use crate::flags::LogFormat;
use log::LevelFilter;
use std::io::Write;

/// Installs the process logger on stderr. `forced` overrides `RUST_LOG`, otherwise the
/// environment wins and `Info` is the fallback.
pub(crate) fn init_logging(forced: Option<LevelFilter>, format: LogFormat) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = forced {
        builder.filter_level(level);
    }
    if format == LogFormat::Json {
        builder.format(|buf, record| {
            let line = serde_json::json!({
                "level": record.level().to_string(),
                "name": record.target(),
                "message": record.args().to_string(),
            });
            writeln!(buf, "{line}")
        });
    }
    builder.target(env_logger::Target::Stderr);
    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}

pub(crate) fn forced_level(verbose: bool, quiet: bool) -> Option<LevelFilter> {
    if quiet {
        Some(LevelFilter::Warn)
    } else if verbose {
        Some(LevelFilter::Debug)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_wins_over_verbose() {
        assert_eq!(forced_level(true, true), Some(LevelFilter::Warn));
        assert_eq!(forced_level(true, false), Some(LevelFilter::Debug));
        assert_eq!(forced_level(false, false), None);
    }
}

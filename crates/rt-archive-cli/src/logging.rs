use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/rt-archive.log";

/// `TRACING_LEVEL` wins over `--verbose`; the fallback keeps HTTP crates quiet.
fn filter_directive(verbose: bool) -> String {
    match env::var("TRACING_LEVEL") {
        Ok(level) if !level.trim().is_empty() => level,
        _ if verbose => "info,rt_archive_core=debug,rt_archive=debug".to_string(),
        _ => "info,reqwest=warn".to_string(),
    }
}

/// Split a log path into the appender's directory and file name.
fn split_log_path(path: &Path) -> (PathBuf, PathBuf) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("rt-archive.log"));
    (dir, file)
}

/// Console output plus a plain-text run log. Hold the guard until exit so
/// the file writer flushes.
pub fn init_logger(verbose: bool) -> WorkerGuard {
    let log_path = env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let (dir, file) = split_log_path(Path::new(&log_path));
    if let Err(err) = fs::create_dir_all(&dir) {
        eprintln!("Cannot create log directory {}: {}", dir.display(), err);
    }

    let appender = tracing_appender::rolling::never(&dir, file);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_target(verbose)
                .without_time(),
        )
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(EnvFilter::new(filter_directive(verbose)))
        .init();

    debug!("Logging to {}", Path::new(&log_path).display());
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_nested_path() {
        let (dir, file) = split_log_path(Path::new("./logs/run.log"));
        assert_eq!(dir, PathBuf::from("./logs"));
        assert_eq!(file, PathBuf::from("run.log"));
    }

    #[test]
    fn test_split_bare_file_name() {
        let (dir, file) = split_log_path(Path::new("run.log"));
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(file, PathBuf::from("run.log"));
    }
}

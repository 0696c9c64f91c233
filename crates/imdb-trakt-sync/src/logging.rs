use anyhow::Result;
use std::fmt;
use std::io;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{Event, Level, Subscriber};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{self as tracing_fmt, time::ChronoUtc, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// How log lines are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogStyle {
    Text,
    Json,
    /// Workflow commands, so warnings and errors become run annotations
    GithubActions,
}

fn select_style(github_actions: Option<&str>, rust_log_json: Option<&str>, stdout_is_terminal: bool) -> LogStyle {
    if github_actions == Some("true") {
        return LogStyle::GithubActions;
    }
    let json = rust_log_json.map(|v| v == "true").unwrap_or(!stdout_is_terminal);
    if json {
        LogStyle::Json
    } else {
        LogStyle::Text
    }
}

/// 0 = info, 1 = debug (with hyper connection noise suppressed), 2+ = trace
fn default_directives(verbose_level: u8) -> &'static str {
    match verbose_level {
        0 => "info",
        1 => "debug,hyper::proto::h1=warn,hyper::client::pool=warn",
        _ => "trace",
    }
}

fn build_filter(verbose_level: u8, quiet: bool) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose_level)))
}

fn github_level(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "error",
        Level::WARN => "warning",
        Level::INFO => "notice",
        _ => "debug",
    }
}

/// Workflow command data must stay on one line
fn escape_workflow_data(message: &str) -> String {
    message.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

/// Renders events as `::<level> file=<file>,line=<line>,title=<target>::<message>`
pub struct GithubActionsFormat;

impl<S, N> FormatEvent<S, N> for GithubActionsFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> fmt::Result {
        let meta = event.metadata();

        let mut message = String::new();
        ctx.field_format().format_fields(Writer::new(&mut message), event)?;

        writeln!(
            writer,
            "::{} file={},line={},title={}::{}",
            github_level(meta.level()),
            meta.file().unwrap_or("unknown"),
            meta.line().unwrap_or(0),
            meta.target(),
            escape_workflow_data(&message)
        )
    }
}

/// Split `logs/imdb-trakt-sync.log` into the directory and the rotation
/// prefix `imdb-trakt-sync`
fn rotation_target(log_path: &Path) -> Result<(PathBuf, String)> {
    let log_dir = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let log_filename = log_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid log filename: {}", log_path.display()))?;
    let log_prefix = log_filename.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(log_filename);
    Ok((log_dir, log_prefix.to_string()))
}

fn console_layer<S>(style: LogStyle) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match style {
        LogStyle::GithubActions => tracing_fmt::layer()
            .event_format(GithubActionsFormat)
            .with_ansi(false)
            .with_writer(io::stdout)
            .boxed(),
        LogStyle::Json => tracing_fmt::layer()
            .json()
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(io::stderr)
            .boxed(),
        LogStyle::Text => tracing_fmt::layer()
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(io::stderr)
            .boxed(),
    }
}

pub fn init_logging_with_file(verbose_level: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let style = select_style(
        std::env::var("GITHUB_ACTIONS").ok().as_deref(),
        std::env::var("RUST_LOG_JSON").ok().as_deref(),
        io::stdout().is_terminal(),
    );

    let file_layer = match log_file {
        Some(log_path) => {
            let (log_dir, log_prefix) = rotation_target(&log_path)?;
            std::fs::create_dir_all(&log_dir)?;

            // Files are named imdb-trakt-sync.2026-10-16 and so on
            let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, log_prefix);
            let layer = if style == LogStyle::Json {
                tracing_fmt::layer()
                    .json()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(file_appender)
                    .boxed()
            } else {
                tracing_fmt::layer()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .with_writer(file_appender)
                    .boxed()
            };
            Some(layer)
        }
        None => None,
    };

    Registry::default()
        .with(build_filter(verbose_level, quiet))
        .with(console_layer(style))
        .with(file_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture_github(emit: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = Registry::default().with(
            tracing_fmt::layer()
                .event_format(GithubActionsFormat)
                .with_ansi(false)
                .with_writer(move || writer.clone()),
        );
        tracing::subscriber::with_default(subscriber, emit);
        captured.text()
    }

    #[test]
    fn test_github_format_maps_levels() {
        let text = capture_github(|| {
            tracing::error!(target: "imdb_trakt_sync::sync", "request failed");
            tracing::warn!(target: "imdb_trakt_sync::sync", "3 items not found");
            tracing::info!(target: "imdb_trakt_sync::sync", "done");
        });
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("::error file="));
        assert!(lines[0].ends_with(",title=imdb_trakt_sync::sync::request failed"));
        assert!(lines[1].starts_with("::warning file="));
        assert!(lines[2].starts_with("::notice file="));
        assert!(lines[2].contains("logging.rs,line="));
    }

    #[test]
    fn test_github_format_debug_and_fields() {
        let text = capture_github(|| {
            tracing::debug!(target: "pacing", waited_ms = 3000, "slept");
        });
        assert!(text.starts_with("::debug "));
        assert!(text.contains("title=pacing::slept waited_ms=3000"));
    }

    #[test]
    fn test_workflow_data_is_escaped() {
        assert_eq!(escape_workflow_data("50% done\nnext"), "50%25 done%0Anext");
    }

    #[test]
    fn test_style_selection() {
        assert_eq!(select_style(Some("true"), Some("true"), true), LogStyle::GithubActions);
        assert_eq!(select_style(Some("false"), None, true), LogStyle::Text);
        assert_eq!(select_style(None, None, false), LogStyle::Json);
        assert_eq!(select_style(None, Some("true"), true), LogStyle::Json);
        assert_eq!(select_style(None, Some("false"), false), LogStyle::Text);
    }

    #[test]
    fn test_verbosity_directives() {
        assert_eq!(default_directives(0), "info");
        assert!(default_directives(1).starts_with("debug,"));
        assert_eq!(default_directives(5), "trace");
    }

    #[test]
    fn test_rotation_target() {
        let (dir, prefix) = rotation_target(Path::new("/var/log/sync/imdb-trakt-sync.log")).unwrap();
        assert_eq!(dir, PathBuf::from("/var/log/sync"));
        assert_eq!(prefix, "imdb-trakt-sync");

        let (dir, prefix) = rotation_target(Path::new("sync")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(prefix, "sync");
    }
}

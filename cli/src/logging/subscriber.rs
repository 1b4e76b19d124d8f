//! Tracing subscriber setup.
//!
//! Both sinks classify an event into an [`EventKind`] first and then format
//! it: [`console_line`] for the terminal and [`file_line`] for the
//! persistent log. Keeping the formatting pure lets it be tested without a
//! subscriber.
use std::fs;
use std::io::Write as _;
use std::sync::Mutex;

use tracing::Level;

use super::utils::{format_utc_datetime, format_utc_time, log_file_path, strip_ansi};
use super::{DRY_RUN_TARGET, STAGE_TARGET};

/// How an event is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EventKind {
    Stage,
    DryRun,
    Info,
    Warn,
    Error,
    Debug,
}

impl EventKind {
    /// Classify by level, then by target for `INFO` events.
    pub(super) fn of(level: Level, target: &str) -> Self {
        match level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO if target == STAGE_TARGET => Self::Stage,
            Level::INFO if target == DRY_RUN_TARGET => Self::DryRun,
            Level::INFO => Self::Info,
            _ => Self::Debug,
        }
    }

    /// Short tag used in the log file; `None` for plain lines.
    const fn file_tag(self) -> Option<&'static str> {
        match self {
            Self::Stage | Self::Info => None,
            Self::DryRun => Some("dry run"),
            Self::Warn => Some("warn"),
            Self::Error => Some("error"),
            Self::Debug => Some("debug"),
        }
    }
}

/// Terminal rendering of one event.
pub(super) fn console_line(kind: EventKind, msg: &str) -> String {
    match kind {
        EventKind::Stage => format!("\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
        EventKind::DryRun => format!("  \x1b[33m[DRY RUN]\x1b[0m {msg}"),
        EventKind::Info => format!("  {msg}"),
        EventKind::Warn => format!("\x1b[33mWARN\x1b[0m  {msg}"),
        EventKind::Error => format!("\x1b[31mERROR\x1b[0m {msg}"),
        EventKind::Debug => format!("  \x1b[2m{msg}\x1b[0m"),
    }
}

/// Log file rendering of one event at time `ts`. ANSI codes are removed.
pub(super) fn file_line(kind: EventKind, ts: &str, msg: &str) -> String {
    let msg = strip_ansi(msg);
    match (kind, kind.file_tag()) {
        (EventKind::Stage, _) => format!("[{ts}] ==> {msg}"),
        (_, Some(tag)) => format!("[{ts}]     [{tag}] {msg}"),
        (_, None) => format!("[{ts}]     {msg}"),
    }
}

/// Banner written at the top of each log file.
pub(super) fn run_header(command: &str, started: &str) -> String {
    let rule = "=".repeat(42);
    format!(
        "{rule}\nmcp-orchestrator {} {command} {started}\n{rule}\n",
        crate::version()
    )
}

/// Pulls the `message` field and classification out of an event.
fn read_event(event: &tracing::Event<'_>) -> (EventKind, String) {
    #[derive(Default)]
    struct Message(String);

    impl tracing::field::Visit for Message {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }

        fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
            if field.name() == "message" {
                self.0 = value.to_string();
            }
        }
    }

    let mut message = Message::default();
    event.record(&mut message);
    let metadata = event.metadata();
    (EventKind::of(*metadata.level(), metadata.target()), message.0)
}

/// Appends every event to `$XDG_CACHE_HOME/mcp-orchestrator/<command>.log`.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Truncate the log file for `command` and write the run header.
    ///
    /// Returns `None` if the cache directory or the file is unusable.
    pub(super) fn new(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        fs::write(&path, run_header(command, &format_utc_datetime())).ok()?;
        let file = fs::OpenOptions::new().append(true).open(&path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let (kind, msg) = read_event(event);
        let line = file_line(kind, &format_utc_time(), &msg);
        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "{line}").ok();
        }
    }
}

struct ConsoleFormat;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormat
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let (kind, msg) = read_event(event);
        writeln!(writer, "{}", console_line(kind, &msg))
    }
}

/// Install the global subscriber: console plus log file.
///
/// Warnings and errors go to stderr, everything else to stdout. `quiet`
/// raises the console floor to `WARN` so JSON on stdout stays parseable;
/// `RUST_LOG` overrides the console level. The log file always receives
/// `DEBUG` and above. A second call keeps the first subscriber.
pub fn init_subscriber(verbose: bool, quiet: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        EnvFilter, Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = match (quiet, verbose) {
        (true, _) => LevelFilter::WARN,
        (false, true) => LevelFilter::DEBUG,
        (false, false) => LevelFilter::INFO,
    };
    let console_filter = EnvFilter::builder()
        .with_default_directive(console_level.into())
        .from_env_lossy();
    let make_writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));

    let console_layer = fmt::layer()
        .event_format(ConsoleFormat)
        .with_writer(make_writer)
        .with_filter(console_filter);
    let file_layer = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

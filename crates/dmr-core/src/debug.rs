use core::fmt;
use std::fs::OpenOptions;
use std::sync::Once;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, fmt as tracingfmt};

#[macro_export]
macro_rules! unimplemented_log {
    ( $($arg:tt)* ) => {{
        tracing::warn!(
            "unimplemented: {}",
            format_args!($($arg)*),
        );
    }};
}

/// if `cond` is false, logs a warning with your message.
#[macro_export]
macro_rules! assert_warn {
    ($cond:expr, $($arg:tt)+) => {{
        if !$cond {
            tracing::warn!(
                target: module_path!(),
                "assertion warning: `{}` failed: {} at {}:{}",
                stringify!($cond),
                format_args!($($arg)+),
                file!(),
                line!(),
            );
        }
    }};
}

/// Width of the location column, messages start after it
const LOCATION_WIDTH: usize = 64;

struct AlignedFormatter;

/// Pulls the `slot` field out of an event so it can be shown as a fixed column
struct SlotVisitor {
    slot: Option<String>,
}

impl tracing::field::Visit for SlotVisitor {
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        if field.name() == "slot" {
            self.slot = Some(format!("TS{}", value));
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "slot" {
            self.slot = Some(format!("TS{:?}", value));
        }
    }
}

/// Turns "crates/dmr-entities/src/slot/dmr_slot.rs" into "[entities/slot] dmr_slot.rs"
fn short_location(file_path: &str) -> String {
    let Some(src_idx) = file_path.find("/src/") else {
        return file_path.to_string();
    };
    let before_src = &file_path[..src_idx];
    let after_src = &file_path[src_idx + 5..];

    let crate_name = match before_src.rfind("dmr-") {
        Some(idx) => &before_src[idx + 4..],
        None => before_src.rsplit('/').next().unwrap_or("unknown"),
    };

    match after_src.rfind('/') {
        Some(last_slash) => {
            let first_module = after_src[..last_slash].split('/').next().unwrap_or("");
            format!("[{}/{}] {}", crate_name, first_module, &after_src[last_slash + 1..])
        }
        None => format!("[{}] {}", crate_name, after_src),
    }
}

impl<S, N> FormatEvent<S, N> for AlignedFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: format::Writer<'_>, event: &tracing::Event<'_>) -> fmt::Result {
        let metadata = event.metadata();

        let mut visitor = SlotVisitor { slot: None };
        event.record(&mut visitor);
        let has_slot = visitor.slot.is_some();
        let slot_str = visitor.slot.unwrap_or_else(|| "   ".to_string());

        let (color_level, color_reset) = match *metadata.level() {
            tracing::Level::ERROR => ("\x1b[31m", "\x1b[0m"),
            tracing::Level::WARN => ("\x1b[33m", "\x1b[0m"),
            tracing::Level::INFO => ("\x1b[32m", "\x1b[0m"),
            tracing::Level::DEBUG => ("\x1b[34m", "\x1b[0m"),
            tracing::Level::TRACE => ("\x1b[35m", "\x1b[0m"),
        };

        // Format: "LEVEL TSn [crate/module] file:line: message"
        let location = format!(
            "{}{:<5}{} {} {}:{}:",
            color_level,
            metadata.level(),
            color_reset,
            slot_str,
            short_location(metadata.file().unwrap_or("unknown")),
            metadata.line().unwrap_or(0)
        );

        let mut message_buf = String::new();
        let message_writer = format::Writer::new(&mut message_buf);
        ctx.field_format().format_fields(message_writer, event)?;

        // The slot is already shown in its own column
        if has_slot {
            if let Some(slot_idx) = message_buf.find("slot=") {
                match message_buf[slot_idx..].find(' ') {
                    Some(space_idx) => message_buf.replace_range(slot_idx..slot_idx + space_idx + 1, ""),
                    None => message_buf.truncate(slot_idx),
                }
            }
        }

        // Burst dumps ("->" towards the modem, "<-" from it) get a slightly shorter indent
        let mut padding = LOCATION_WIDTH;
        if message_buf.starts_with("->") || message_buf.starts_with("<-") {
            padding -= 3;
        }

        write!(writer, "{:<width$} {}", location, message_buf, width = padding)?;
        writeln!(writer)
    }
}

static INIT_LOG: Once = Once::new();

/// Sets up logging with maximum verbosity (trace level)
/// Mainly for unit tests
pub fn setup_logging_verbose() {
    setup_logging(EnvFilter::new("trace"), None);
}

/// Sets up default logging to stdout and optionally, a verbose log file
/// Returns a guard, that needs to be kept alive for logging to file to work
pub fn setup_logging_default(verbose_logfile: Option<String>) -> Option<WorkerGuard> {
    let logfile_and_filter = verbose_logfile.map(|file| (file, get_default_logfile_filter()));
    setup_logging(get_default_stdout_filter(), logfile_and_filter)
}

pub fn get_default_stdout_filter() -> EnvFilter {
    let directives = [
        // Per-burst codec chatter
        "dmr_fec=warn",
        "dmr_pdus=info",
        "dmr_core::bitbuffer=warn",
        // Transports
        "dmr_entities::network=info",
        "dmr_entities::modem=info",
        // Call state machine
        "dmr_entities::slot=debug",
        "dmr_entities::access_control=debug",
    ];

    directives.iter().fold(EnvFilter::new("info"), |filter, d| match d.parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    })
}

fn get_default_logfile_filter() -> EnvFilter {
    EnvFilter::new("debug")
}

/// Sets up logging to stdout and optionally, a verbose log file
/// If an output file is requested, returns Some<WorkerGuard>. Keep this value alive
/// or logging to file may cease working. If no output file is provided, or it cannot
/// be opened, returns None.
fn setup_logging(stdout_filter: EnvFilter, outfile: Option<(String, EnvFilter)>) -> Option<WorkerGuard> {
    let file = outfile.and_then(|(path, filter)| {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(f) => Some((f, filter)),
            Err(e) => {
                eprintln!("Failed to open log file {}: {}", path, e);
                None
            }
        }
    });

    match file {
        Some((file, file_filter)) => {
            let (file_writer, guard) = tracing_appender::non_blocking(file);
            INIT_LOG.call_once(|| {
                let file_layer = tracingfmt::layer()
                    .event_format(AlignedFormatter)
                    .with_writer(file_writer)
                    .with_ansi(false);
                let stdout_layer = tracingfmt::layer().event_format(AlignedFormatter);

                tracing_subscriber::registry()
                    .with(file_layer.with_filter(file_filter))
                    .with(stdout_layer.with_filter(stdout_filter))
                    .init();
            });
            Some(guard)
        }
        None => {
            INIT_LOG.call_once(|| {
                let stdout_layer = tracingfmt::layer().event_format(AlignedFormatter);
                tracing_subscriber::registry().with(stdout_layer.with_filter(stdout_filter)).init();
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_location() {
        assert_eq!(short_location("crates/dmr-entities/src/slot/dmr_slot.rs"), "[entities/slot] dmr_slot.rs");
        assert_eq!(short_location("crates/dmr-fec/src/bptc19696.rs"), "[fec] bptc19696.rs");
        assert_eq!(short_location("somewhere/else.rs"), "somewhere/else.rs");
    }
}

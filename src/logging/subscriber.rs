//! Tracing subscriber setup: console formatter and initialisation.
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Target of stage header events.
pub const STAGE_TARGET: &str = "stilyagi::stage";

/// Extracts the `message` field from a [`tracing::Event`].
#[derive(Default)]
struct MessageExtractor {
    message: String,
}

impl tracing::field::Visit for MessageExtractor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

/// A [`tracing_subscriber::fmt::FormatEvent`] that prints stage headers,
/// indented progress lines and coloured warnings.
struct StilyagiFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for StilyagiFormatter
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
        let metadata = event.metadata();
        let level = *metadata.level();
        let target = metadata.target();

        let mut extractor = MessageExtractor::default();
        event.record(&mut extractor);
        let msg = &extractor.message;

        match level {
            tracing::Level::ERROR => writeln!(writer, "\x1b[31mERROR\x1b[0m {msg}"),
            tracing::Level::WARN => writeln!(writer, "\x1b[33mWARN\x1b[0m  {msg}"),
            tracing::Level::INFO if target == STAGE_TARGET => {
                writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m")
            }
            tracing::Level::INFO => writeln!(writer, "  {msg}"),
            _ => writeln!(writer, "  \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Level filter for the console: `RUST_LOG` when set, otherwise INFO, or
/// DEBUG with `verbose`.
fn console_filter(verbose: bool) -> EnvFilter {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy()
}

/// Initialise the global [`tracing`] subscriber.
///
/// Log output goes to stderr so that command results printed to stdout stay
/// machine-readable. Must be called once at program startup, before any
/// logging.
pub fn init_subscriber(verbose: bool) {
    use tracing_subscriber::{Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

    let console_layer = fmt::layer()
        .event_format(StilyagiFormatter)
        .with_writer(std::io::stderr)
        .with_filter(console_filter(verbose));

    tracing_subscriber::registry().with(console_layer).init();
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::{Layer as _, fmt};

    use super::*;

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

    fn capture(level: LevelFilter, emit: impl FnOnce()) -> String {
        let out = Captured::default();
        let writer = out.clone();
        let layer = fmt::layer()
            .event_format(StilyagiFormatter)
            .with_writer(move || writer.clone())
            .with_filter(level);
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, emit);
        let bytes = out.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn formats_each_level() {
        let text = capture(LevelFilter::DEBUG, || {
            tracing::info!(target: "stilyagi::stage", "Packaging styles");
            tracing::info!("wrote archive");
            tracing::debug!("details");
            tracing::warn!("careful");
            tracing::error!("broken");
        });
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "\x1b[1;34m==>\x1b[0m \x1b[1mPackaging styles\x1b[0m",
                "  wrote archive",
                "  \x1b[2mdetails\x1b[0m",
                "\x1b[33mWARN\x1b[0m  careful",
                "\x1b[31mERROR\x1b[0m broken",
            ]
        );
    }

    #[test]
    fn logger_methods_reach_the_formatter() {
        let log = crate::logging::Logger::new("install");
        let text = capture(LevelFilter::INFO, || {
            log.stage("Installing leynos/concordat-vale");
            log.warn("no packaged manifest found");
            log.error("installing leynos/concordat-vale: HTTP status 404");
        });
        assert_eq!(
            text,
            "\x1b[1;34m==>\x1b[0m \x1b[1mInstalling leynos/concordat-vale\x1b[0m\n\
             \x1b[33mWARN\x1b[0m  no packaged manifest found\n\
             \x1b[31mERROR\x1b[0m installing leynos/concordat-vale: HTTP status 404\n"
        );
    }

    #[test]
    fn debug_is_hidden_at_info() {
        let text = capture(LevelFilter::INFO, || {
            tracing::debug!("hidden");
            tracing::info!("shown");
        });
        assert_eq!(text, "  shown\n");
    }
}

//! Tracing subscriber setup shared by the CLI and host applications.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive, e.g. `nifcore=debug`.
pub const LOG_ENV: &str = "NIF_LOG";

/// Environment variable enabling the Chrome trace writer (`chrome-trace` feature).
pub const TRACE_ENV: &str = "NIF_TRACE";

/// Verbosity requested on the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    #[default]
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    /// Default filter directive for this verbosity.
    pub const fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Keeps optional trace writers alive; drop it to flush them.
#[derive(Default)]
pub struct LogGuard {
    #[cfg(feature = "chrome-trace")]
    _chrome: Option<tracing_chrome::FlushGuard>,
}

/// Install the global subscriber.
///
/// `NIF_LOG` takes precedence over `verbosity`. Calling this twice is harmless;
/// the second install is ignored.
pub fn init_logging(verbosity: Verbosity) -> LogGuard {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    #[cfg(feature = "chrome-trace")]
    {
        if std::env::var(TRACE_ENV).ok().as_deref() == Some("1") {
            let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
                .file("nif-trace.json")
                .build();
            let subscriber = tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .with(chrome_layer);
            if tracing::subscriber::set_global_default(subscriber).is_err() {
                return LogGuard::default();
            }
            return LogGuard { _chrome: Some(guard) };
        }
    }

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    let _ = tracing::subscriber::set_global_default(subscriber);
    LogGuard::default()
}

//!
//! # Operator notices
//!
//! Provisioning, ledger setup and the runner report what they did through a [Sink].
//! The sink is handed to each operation explicitly; there is no global logger to swap out.
//!

use std::fmt;
use std::sync::{Arc, Mutex};

/// Receives human-readable notices such as "created db \"app\"" or
/// "executed migration 3 in 41.2ms".
pub trait Sink {
    fn notice(&self, args: fmt::Arguments<'_>);
}

/// Writes notices to stdout, prefixed with the local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn notice(&self, args: fmt::Arguments<'_>) {
        println!("{} {}", chrono::Local::now().format("%Y/%m/%d %H:%M:%S"), args);
    }
}

/// Forwards notices as `tracing` events at INFO level.
#[cfg(feature = "tracing")]
#[cfg_attr(docsrs, doc(cfg(feature = "tracing")))]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[cfg(feature = "tracing")]
impl Sink for TracingSink {
    fn notice(&self, args: fmt::Arguments<'_>) {
        tracing::info!(target: "schemata", "{}", args);
    }
}

/// Drops every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl Sink for NullSink {
    fn notice(&self, _args: fmt::Arguments<'_>) {}
}

/// Keeps notices in memory, mostly useful for asserting on them in tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notice received so far, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl Sink for MemorySink {
    fn notice(&self, args: fmt::Arguments<'_>) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(args.to_string());
        }
    }
}

impl<S: Sink + ?Sized> Sink for &S {
    fn notice(&self, args: fmt::Arguments<'_>) {
        (**self).notice(args)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn notice(&self, args: fmt::Arguments<'_>) {
        (**self).notice(args)
    }
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn notice(&self, args: fmt::Arguments<'_>) {
        (**self).notice(args)
    }
}

/// `notice!(sink, "format", args...)`
macro_rules! notice {
    ($sink:expr, $($arg:tt)+) => {
        $crate::log::Sink::notice($sink, format_args!($($arg)+))
    };
}
pub(crate) use notice;

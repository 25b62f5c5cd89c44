use crate::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cancellation flag shared between a running operation and whoever wants to stop it.
///
/// Operations check the flag before each statement they issue. A statement that is already
/// executing on the server runs to completion and is not rolled back.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    raised: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask any operation observing this handle to stop before its next statement.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Fails with [Error::Interrupted] naming `step` if the flag has been raised.
    pub(crate) fn check(&self, step: impl FnOnce() -> String) -> Result<(), Error> {
        if self.is_raised() {
            #[cfg(feature = "tracing")]
            tracing::debug!("Interrupt observed, stopping");
            return Err(Error::Interrupted(step()));
        }
        Ok(())
    }
}

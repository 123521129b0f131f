//! Explicitly owned logging context
//!
//! A [`LogContext`] holds a ready-built `tracing` dispatcher. Library code
//! never installs subscribers on its own: callers either install the context
//! process-wide (binaries) or hand it to the cross-validator, which scopes
//! every run to it.

use serde::{Deserialize, Serialize};
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

use crate::{Error, Result};

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives, e.g. `"info"` or `"trueno_rank=debug,warn"`
    pub filter: String,
    /// Colored output
    pub ansi: bool,
    /// Print event targets
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            ansi: false,
            with_target: true,
        }
    }
}

/// A `tracing` dispatcher built from a [`LogConfig`].
#[derive(Debug, Clone)]
pub struct LogContext {
    dispatch: Dispatch,
}

impl LogContext {
    /// Build a formatting subscriber writing to stderr.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the filter directives do not parse
    pub fn new(config: &LogConfig) -> Result<Self> {
        let filter = EnvFilter::try_new(&config.filter).map_err(|e| {
            Error::Config(format!("invalid log filter '{}': {e}", config.filter))
        })?;
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(config.ansi)
            .with_target(config.with_target)
            .with_writer(std::io::stderr)
            .finish();
        Ok(Self {
            dispatch: Dispatch::new(subscriber),
        })
    }

    /// A context that discards every event.
    #[must_use]
    pub fn silent() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    /// Run `f` with this context as the thread's default dispatcher.
    pub fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Make this context the process-wide default.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a global default was already set
    pub fn install_global(&self) -> Result<()> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())
            .map_err(|e| Error::Config(format!("global logger already installed: {e}")))
    }

    /// The underlying dispatcher.
    #[must_use]
    pub const fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }
}

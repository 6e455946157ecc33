//! Crate configuration
//!
//! A `Config` decides where suppressed failures go, how bridged futures
//! report failures, and which completion backend new futures use. Every
//! future remembers the configuration it was created under.
//!
//! Most applications install one configuration for the whole process during
//! start-up, before creating any future, via `Config::install()`. When none
//! was installed, `Config::global()` hands out a default configuration which
//! logs failures through `tracing`, suppresses them on bridges, and uses the
//! exclusive completion state backend.

use crate::error::{ConfigError, Failure};
use crate::response::Response;
use crate::sink::{ErrorSink, TracingSink};
use once_cell::sync::{Lazy, OnceCell};
use std::fmt;
use std::sync::Arc;


/// Process-wide configuration, written at most once
static INSTALLED: OnceCell<Config> = OnceCell::new();

/// Configuration used when none was installed
static DEFAULT: Lazy<Config> = Lazy::new(Config::default);


/// Behaviour of bridged futures when the source future failed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BridgePolicy {
    /// Resolve with an invalid response, like the primary accessors do
    #[default]
    Suppress,

    /// Resolve with the captured failure
    Propagate,
}


/// Completion backend used by newly created futures
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Exclusively owned completion state with lock-free reads
    #[default]
    Exclusive,

    /// Mutex-protected state with condition variable signalling
    Signal,

    /// Token handle into the process-wide slot pool of the value type
    Pooled,
}


/// Crate configuration
#[derive(Clone)]
pub struct Config {
    /// Destination of suppressed failures
    sink: Arc<dyn ErrorSink>,

    /// Failure behaviour of bridged futures
    bridge_policy: BridgePolicy,

    /// Backend of new futures
    backend: BackendKind,
}
//
impl Config {
    /// Start building a configuration from the defaults
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder { config: Config::default() }
    }

    /// Configuration installed for this process, or the default one
    pub fn global() -> &'static Config {
        INSTALLED.get().unwrap_or(&*DEFAULT)
    }

    /// Install this configuration for the whole process
    ///
    /// This should be done once during start-up, before any future is
    /// created. Futures created earlier keep the default configuration.
    ///
    pub fn install(self) -> Result<(), ConfigError> {
        INSTALLED.set(self).map_err(|_| ConfigError::AlreadyInstalled)
    }

    /// Hand a failure over to the error sink
    pub fn report(&self, failure: &Failure) {
        self.sink.report(failure);
    }

    /// Turn a result into a response, reporting its error if there is one
    pub fn suppress<T, E>(&self, result: Result<T, E>) -> Response<T>
        where E: Into<Failure>
    {
        match result {
            Ok(value) => Response::valid(value),
            Err(error) => {
                self.report(&error.into());
                Response::invalid()
            }
        }
    }

    /// Destination of suppressed failures
    pub fn sink(&self) -> &dyn ErrorSink {
        &*self.sink
    }

    /// Failure behaviour of bridged futures
    pub fn bridge_policy(&self) -> BridgePolicy {
        self.bridge_policy
    }

    /// Backend of new futures
    pub fn backend(&self) -> BackendKind {
        self.backend
    }
}
//
impl Default for Config {
    fn default() -> Self {
        Config {
            sink: Arc::new(TracingSink),
            bridge_policy: BridgePolicy::default(),
            backend: BackendKind::default(),
        }
    }
}
//
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
         .field("bridge_policy", &self.bridge_policy)
         .field("backend", &self.backend)
         .finish_non_exhaustive()
    }
}


/// Builder of `Config`
pub struct ConfigBuilder {
    config: Config,
}
//
impl ConfigBuilder {
    /// Send suppressed failures to this sink
    pub fn sink(mut self, sink: impl ErrorSink + 'static) -> Self {
        self.config.sink = Arc::new(sink);
        self
    }

    /// Pick the failure behaviour of bridged futures
    pub fn bridge_policy(mut self, policy: BridgePolicy) -> Self {
        self.config.bridge_policy = policy;
        self
    }

    /// Pick the backend of new futures
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.config.backend = backend;
        self
    }

    /// Finish building
    pub fn build(self) -> Config {
        self.config
    }

    /// Finish building and install the result for the whole process
    pub fn install(self) -> Result<(), ConfigError> {
        self.build().install()
    }
}


/// Turn a result into a response using the process-wide configuration
pub fn suppress<T, E>(result: Result<T, E>) -> Response<T>
    where E: Into<Failure>
{
    Config::global().suppress(result)
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriverError;
    use crate::test_utils::CountingSink;

    /// Check the default configuration
    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.bridge_policy(), BridgePolicy::Suppress);
        assert_eq!(config.backend(), BackendKind::Exclusive);
    }

    /// Check that the builder sets every knob
    #[test]
    fn builder() {
        let sink = CountingSink::new();
        let config = Config::builder().sink(sink.clone())
                                      .bridge_policy(BridgePolicy::Propagate)
                                      .backend(BackendKind::Pooled)
                                      .build();
        assert_eq!(config.bridge_policy(), BridgePolicy::Propagate);
        assert_eq!(config.backend(), BackendKind::Pooled);

        config.report(&Failure::msg("boom"));
        assert_eq!(sink.messages(), vec!["boom"]);
    }

    /// Check that suppression reports errors exactly once
    #[test]
    fn suppression() {
        let sink = CountingSink::new();
        let config = Config::builder().sink(sink.clone()).build();

        let ok: Result<u32, DriverError> = Ok(4);
        assert_eq!(config.suppress(ok), Response::valid(4));
        assert_eq!(sink.count(), 0);

        let err: Result<u32, DriverError> = Err(DriverError::Abandoned);
        assert_eq!(config.suppress(err), Response::invalid());
        assert_eq!(sink.count(), 1);
    }

    /// Check that the global configuration can only be installed once
    #[test]
    fn install_once() {
        // Other tests never install, so the first install here must win
        let first = Config::builder().bridge_policy(BridgePolicy::Suppress)
                                     .install();
        assert_eq!(first, Ok(()));
        let second = Config::builder().install();
        assert_eq!(second, Err(ConfigError::AlreadyInstalled));
        assert_eq!(Config::global().backend(), BackendKind::Exclusive);
    }
}

//! Helpers shared by the unit tests of this crate

use crate::config::Config;
use crate::error::Failure;
use crate::sink::ErrorSink;
use parking_lot::Mutex;
use std::sync::{Arc, Once};


static INIT_LOGGING: Once = Once::new();


/// Initialize test logging, only once per process
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_thread_ids(true)
            .with_ansi(false)
            .try_init();
    });
}


/// Error sink which remembers every failure it has been handed
#[derive(Clone, Default)]
pub struct CountingSink {
    failures: Arc<Mutex<Vec<Failure>>>,
}
//
impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of failures reported so far
    pub fn count(&self) -> usize {
        self.failures.lock().len()
    }

    /// Messages of the failures reported so far
    pub fn messages(&self) -> Vec<String> {
        self.failures.lock().iter().map(|f| f.to_string()).collect()
    }

    /// Failures reported so far
    pub fn failures(&self) -> Vec<Failure> {
        self.failures.lock().clone()
    }

    /// Configuration reporting to this sink
    pub fn config(&self) -> Config {
        Config::builder().sink(self.clone()).build()
    }
}
//
impl ErrorSink for CountingSink {
    fn report(&self, failure: &Failure) {
        self.failures.lock().push(failure.clone());
    }
}

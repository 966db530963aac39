use std::time::Duration;

use crate::error::{Result, SelectError};

pub const DEFAULT_READ_BUFFER_SIZE: usize = 20;
pub const DEFAULT_EVENTS_CAPACITY: usize = 1024;
pub const DEFAULT_GREETING: &[u8] = b"Welcome client!";

/// Configuration for the [`Reactor`](crate::Reactor).
///
/// Use `ReactorConfig::builder()` for construction; unset fields take the
/// values from `ReactorConfig::default()`.
///
/// ## Reads
///
/// - read_buffer_size: capacity of the single buffer reused for every read.
///   Each readable event performs at most one read of this size.
///
/// ## Polling
///
/// - events_capacity: maximum readiness entries reported per wait
/// - poll_timeout: `None` blocks until something is ready; `Some(d)` bounds
///   each wait so [`Reactor::run`](crate::Reactor::run) can notice shutdown
///   without a wake-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactorConfig {
    /// Size of the per-read buffer
    pub read_buffer_size: usize,
    /// Bytes sent to every peer right after it is accepted
    pub greeting: Vec<u8>,
    /// Readiness entries reported per wait
    pub events_capacity: usize,
    /// Upper bound on a single wait
    pub poll_timeout: Option<Duration>,
    /// Enable TCP_NODELAY on accepted peers
    pub no_delay: bool,
}

impl ReactorConfig {
    pub fn builder() -> ReactorConfigBuilder {
        ReactorConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if self.read_buffer_size == 0 {
            return Err(SelectError::Configuration(
                "read_buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.events_capacity == 0 {
            return Err(SelectError::Configuration(
                "events_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            greeting: DEFAULT_GREETING.to_vec(),
            events_capacity: DEFAULT_EVENTS_CAPACITY,
            poll_timeout: None,
            no_delay: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct ReactorConfigBuilder {
    read_buffer_size: Option<usize>,
    greeting: Option<Vec<u8>>,
    events_capacity: Option<usize>,
    poll_timeout: Option<Option<Duration>>,
    no_delay: Option<bool>,
}

impl ReactorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = Some(size);
        self
    }

    pub fn greeting(mut self, greeting: impl Into<Vec<u8>>) -> Self {
        self.greeting = Some(greeting.into());
        self
    }

    pub fn events_capacity(mut self, capacity: usize) -> Self {
        self.events_capacity = Some(capacity);
        self
    }

    pub fn poll_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }

    pub fn no_delay(mut self, enabled: bool) -> Self {
        self.no_delay = Some(enabled);
        self
    }

    pub fn build(self) -> ReactorConfig {
        let default = ReactorConfig::default();
        ReactorConfig {
            read_buffer_size: self.read_buffer_size.unwrap_or(default.read_buffer_size),
            greeting: self.greeting.unwrap_or(default.greeting),
            events_capacity: self.events_capacity.unwrap_or(default.events_capacity),
            poll_timeout: self.poll_timeout.unwrap_or(default.poll_timeout),
            no_delay: self.no_delay.unwrap_or(default.no_delay),
        }
    }
}

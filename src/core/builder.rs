use std::sync::Arc;

use crate::{
    config::Config,
    error::RuntimeError,
    events::Bus,
    parser::LineParser,
    subscribers::{Subscribe, SubscriberSet},
    tail::LogLocator,
};

use super::monitor::Monitor;

/// Builder for constructing a [`Monitor`].
pub struct MonitorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl MonitorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers.
    ///
    /// Each subscriber gets a dedicated worker with its own bounded view of the bus.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the monitor.
    ///
    /// Compiles the parser rules and the log pattern, creates the bus and spawns
    /// subscriber workers, so it must be called from within a tokio runtime.
    pub fn build(self) -> Result<Arc<Monitor>, RuntimeError> {
        let parser = LineParser::with_max_line_len(self.cfg.max_line_len_clamped())?;
        // Reject a bad glob now rather than at the first start_run.
        LogLocator::new(self.cfg.log_dir_path(), self.cfg.log_pattern.clone())?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, &bus);
        Ok(Arc::new(Monitor::new_internal(self.cfg, bus, parser, subs)))
    }
}

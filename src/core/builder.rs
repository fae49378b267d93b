use std::sync::Arc;

use crate::{
    core::{Config, shutdown},
    subscribers::{LogWriter, Subscribe, SubscriberSet},
};

use super::orchestrator::Orchestrator;

/// Builder for constructing an [`Orchestrator`] with custom subscribers.
pub struct OrchestratorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers, replacing any added before.
    ///
    /// Subscribers receive every lifecycle event through dedicated workers with
    /// bounded queues. The built-in [`LogWriter`] is added on top unless
    /// [`Config::silent`] is set.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Appends one event subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the orchestrator.
    ///
    /// Spawns the subscriber workers and, if [`Config::signals`] is set, the OS
    /// signal watcher. Must be called from within a tokio runtime.
    pub fn build(self) -> Arc<Orchestrator> {
        let mut subscribers = self.subscribers;
        if !self.cfg.silent {
            subscribers.insert(0, Arc::new(LogWriter::new()));
        }
        let subs = SubscriberSet::new(subscribers);

        let signals = self.cfg.signals;
        let orch = Arc::new(Orchestrator::new_internal(self.cfg, subs));

        if signals {
            shutdown::spawn_watcher(Arc::downgrade(&orch), orch.context(), orch.stopped_token());
        }
        orch
    }
}

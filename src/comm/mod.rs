use anyhow::{anyhow, Result};
use reqwest::Client;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info_span, Instrument};

use crate::comm::context::PlugPollContext;
use crate::data::DbManager;
use crate::model::MonitorConfig;

mod context;
pub mod parse;

pub struct PlugWatcher {
    config: MonitorConfig,
    contexts: Vec<PlugPollContext>,
    handles: Vec<JoinHandle<()>>,
}

impl PlugWatcher {
    pub fn new(config: MonitorConfig, db: Arc<DbManager>) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        let contexts = config
            .plugs
            .iter()
            .map(|(name, address)| {
                PlugPollContext::new(name.clone(), address, client.clone(), db.clone())
            })
            .collect();

        Ok(PlugWatcher {
            config,
            contexts,
            handles: vec![],
        })
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }

    pub fn watch(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(anyhow!("Monitor already running!"));
        }

        for context in &self.contexts {
            let span = info_span!("Plug", name = %context.name(), url = %context.url());
            let poll_time = self.config.poll_time;

            self.handles
                .push(tokio::spawn(context.clone().poll_loop(poll_time).instrument(span)));
        }

        Ok(())
    }

    pub fn stop(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for PlugWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

//! Shared application state handed to every RPC handler and route.

use std::sync::Arc;

use orc_core::config::{ExecutorConfig, ModelConfig};
use orc_executor::Executor;
use orc_store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub executor: Arc<Executor>,
    pub config: Arc<ExecutorConfig>,
    pub model_config: Arc<ModelConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        executor: Arc<Executor>,
        config: Arc<ExecutorConfig>,
        model_config: Arc<ModelConfig>,
    ) -> Self {
        Self { store, executor, config, model_config }
    }
}

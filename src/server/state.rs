use std::sync::Arc;

use tracing::info;

use crate::Result;
use crate::config::Config;
use crate::recommender::RecommendationEngine;
use crate::trace::TraceLog;

/// Shared state handed to every request handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    /// Used when a request omits `top_k` or sends 0
    pub default_top_k: usize,
    pub balance_by_default: bool,
    pub trace: Option<TraceLog>,
}

impl AppState {
    #[inline]
    pub fn new(engine: Arc<RecommendationEngine>) -> Self {
        Self {
            engine,
            default_top_k: 10,
            balance_by_default: true,
            trace: None,
        }
    }

    #[inline]
    pub fn with_trace(mut self, trace: TraceLog) -> Self {
        self.trace = Some(trace);
        self
    }

    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        let engine = RecommendationEngine::from_config(config)?;

        let mut state = Self::new(Arc::new(engine));
        state.default_top_k = config.recommender.default_top_k.max(1);
        state.balance_by_default = config.recommender.balance_by_default;

        if config.logging.trace_requests {
            let trace = TraceLog::new(config.logs_dir());
            info!("Tracing requests to {}", trace.path().display());
            state = state.with_trace(trace);
        }

        Ok(state)
    }
}

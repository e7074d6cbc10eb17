use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::interview::evaluator::InterviewEvaluator;
use crate::pipeline::locks::LockRegistry;
use crate::scheduler::CallScheduler;
use crate::scoring::semantic::SemanticScorer;

/// Shared application state passed to all route handlers.
///
/// The scorer and evaluator sit behind trait objects so tests can wire in
/// stubs without touching the HTTP layer.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub semantic_scorer: Arc<dyn SemanticScorer>,
    pub evaluator: Arc<dyn InterviewEvaluator>,
    pub scheduler: CallScheduler,
    pub locks: LockRegistry,
    pub config: Config,
}

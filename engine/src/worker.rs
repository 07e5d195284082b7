use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use tracing::debug;

use crate::{EvaluationEngine, GameLogic};

/// Background cache warmer.
///
/// Evaluates every prefix of a scripted move sequence so that an idle screen
/// (or an upcoming replay) finds all of its frames already memoized. Runs on
/// its own OS thread against the shared engine; the interactive thread may
/// evaluate concurrently, the cache mutex keeps them consistent.
///
/// Cancellation is cooperative: the flag is checked between cache entries,
/// and `stop` (or drop) joins the thread, so the primer is always gone before
/// the engine it borrows can be torn down.
pub struct CachePrimer {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CachePrimer {
    pub fn spawn<G>(
        engine: Arc<EvaluationEngine<G>>,
        logic: G,
        level: G::State,
        moves: Vec<G::Action>,
    ) -> Self
    where
        G: GameLogic + Send + Sync + 'static,
        G::State: Send + Sync + 'static,
        G::Action: Send + 'static,
    {
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_flag = Arc::clone(&cancel);
        let handle = std::thread::spawn(move || {
            for end in 1..=moves.len() {
                if cancel_flag.load(Ordering::Relaxed) {
                    debug!(primed = end - 1, "cache priming cancelled");
                    return;
                }
                engine.evaluate(&logic, &level, &moves[..end]);
            }
            debug!(primed = moves.len(), "cache priming finished");
        });
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Request cancellation and join the worker thread.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CachePrimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::debug;

use crate::{EvaluationResult, GameLogic};

/// Engine-level knobs. One instance per engine, not process-wide.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Emit a `tracing` event with the wall time of every fresh `apply`.
    pub log_timings: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { log_timings: true }
    }
}

struct CacheState<S> {
    /// Scope (level path) the entries belong to. Entries from one level are
    /// never valid for another.
    scope: Option<String>,
    entries: HashMap<String, Arc<EvaluationResult<S>>>,
}

/// Memoized, replayable evaluation of an action history on top of a level.
///
/// Evaluation is recursive: a history is its prefix evaluated first, then one
/// action applied to the prefix's settled end frame. Each unique post-trim
/// prefix is computed at most once per cache lifetime; that contract is what
/// makes undo/redo and replay affordable, so it is load-bearing rather than
/// an optimization.
///
/// The cache may be shared between the interactive thread and a background
/// priming worker. The mutex is held only around lookup and store, never
/// across `apply` — a race can duplicate work but never corrupt an entry
/// (first write wins).
pub struct EvaluationEngine<G: GameLogic> {
    config: EngineConfig,
    cache: Mutex<CacheState<G::State>>,
}

impl<G: GameLogic> Default for EvaluationEngine<G> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<G: GameLogic> EvaluationEngine<G> {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            cache: Mutex::new(CacheState {
                scope: None,
                entries: HashMap::new(),
            }),
        }
    }

    /// Evaluate `actions` applied to `level`, computing missing prefixes.
    ///
    /// `None` means the final action was illegal or had no effect; the caller
    /// must not commit it. Everything up to that action is still cached.
    pub fn evaluate(
        &self,
        logic: &G,
        level: &G::State,
        actions: &[G::Action],
    ) -> Option<Arc<EvaluationResult<G::State>>> {
        self.evaluate_inner(logic, level, actions, false)
    }

    /// Like [`evaluate`](Self::evaluate) but returns `None` immediately on a
    /// cache miss instead of computing. Used by advisory/preview callers that
    /// must never pay for a fresh evaluation.
    pub fn evaluate_cache_only(
        &self,
        logic: &G,
        level: &G::State,
        actions: &[G::Action],
    ) -> Option<Arc<EvaluationResult<G::State>>> {
        self.evaluate_inner(logic, level, actions, true)
    }

    pub fn clear(&self) {
        let mut cache = self.cache.lock().expect("evaluation cache poisoned");
        cache.entries.clear();
    }

    /// Number of memoized histories. Test/diagnostic aid.
    pub fn cache_len(&self) -> usize {
        let cache = self.cache.lock().expect("evaluation cache poisoned");
        cache.entries.len()
    }

    fn evaluate_inner(
        &self,
        logic: &G,
        level: &G::State,
        actions: &[G::Action],
        cache_only: bool,
    ) -> Option<Arc<EvaluationResult<G::State>>> {
        let actions = trim_to_last_run_after_reset::<G>(actions);

        {
            let mut cache = self.cache.lock().expect("evaluation cache poisoned");
            let scope = G::cache_scope(level);
            if cache.scope.as_deref() != Some(scope) {
                cache.scope = Some(scope.to_string());
                cache.entries.clear();
            }
        }

        self.evaluate_recursive(logic, level, actions, cache_only)
    }

    fn evaluate_recursive(
        &self,
        logic: &G,
        level: &G::State,
        actions: &[G::Action],
        cache_only: bool,
    ) -> Option<Arc<EvaluationResult<G::State>>> {
        if actions.is_empty() {
            return Some(Arc::new(EvaluationResult::single(level.clone())));
        }

        let cache_key = encode_actions::<G>(actions);

        {
            let cache = self.cache.lock().expect("evaluation cache poisoned");
            if let Some(cached) = cache.entries.get(&cache_key) {
                return Some(Arc::clone(cached));
            }
            if cache_only {
                return None;
            }
        }

        let (last, prefix) = actions.split_last().expect("non-empty actions");
        let predecessor = self.evaluate_recursive(logic, level, prefix, false)?;

        let started = Instant::now();
        let updated = logic.apply(predecessor.last(), *last);
        if self.config.log_timings {
            debug!(
                key = %cache_key,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "applied action"
            );
        }

        let frames = updated?;
        let result = Arc::new(EvaluationResult { frames });

        let mut cache = self.cache.lock().expect("evaluation cache poisoned");
        let entry = cache
            .entries
            .entry(cache_key)
            .or_insert_with(|| Arc::clone(&result));
        Some(Arc::clone(entry))
    }
}

/// Histories keep reset tombstones; evaluation only sees the run after the
/// last one.
pub fn trim_to_last_run_after_reset<G: GameLogic>(actions: &[G::Action]) -> &[G::Action] {
    let Some(marker) = G::reset_action() else {
        return actions;
    };
    match actions.iter().rposition(|a| *a == marker) {
        Some(index) => &actions[index + 1..],
        None => actions,
    }
}

pub fn encode_actions<G: GameLogic>(actions: &[G::Action]) -> String {
    actions.iter().map(|&a| G::encode_action(a)).collect()
}

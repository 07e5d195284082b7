pub mod eval;
pub mod regression;
pub mod worker;

pub use eval::{EngineConfig, EvaluationEngine};
pub use worker::CachePrimer;

/// A deterministic, replayable game.
///
/// `apply` maps a settled state plus one discrete action to the frames that
/// action produces. The engine never mutates states it is handed; every new
/// frame starts as a clone of its predecessor inside `apply`.
pub trait GameLogic {
    type State: Clone;
    type Action: Copy + Eq;

    /// Apply one action to a settled state, producing one or more frames.
    ///
    /// Returns `None` when the action is illegal (blocked movement, empty
    /// inventory, no live bomb) or targets a terminal (dead/won) state. A
    /// `None` must leave the caller's history uncommitted.
    fn apply(&self, state: &Self::State, action: Self::Action) -> Option<Vec<Self::State>>;

    /// The history tombstone that marks a reset, if the game has one.
    ///
    /// Resets are recorded in the move list rather than clearing it, so undo
    /// can step back through them. Evaluation only ever sees the suffix after
    /// the last tombstone.
    fn reset_action() -> Option<Self::Action>;

    /// One-character encoding used for cache keys and persisted replays.
    ///
    /// Panics on the reset tombstone: it is a trim marker, never part of an
    /// encoded run.
    fn encode_action(action: Self::Action) -> char;

    /// Cache scope of a state. The evaluation cache is cleared wholesale
    /// whenever the scope changes (a different level was loaded).
    fn cache_scope(state: &Self::State) -> &str;
}

/// The frames produced by evaluating an action history.
///
/// Length 1 normally; more when a single action causes visually distinct
/// settling sub-steps (a pause after digging out your own grip, one frame per
/// bomb in a chain reaction, a gravity settle).
#[derive(Debug, Clone)]
pub struct EvaluationResult<S> {
    pub frames: Vec<S>,
}

impl<S> EvaluationResult<S> {
    pub fn single(frame: S) -> Self {
        Self {
            frames: vec![frame],
        }
    }

    /// The settled end state. Frames are never empty.
    pub fn last(&self) -> &S {
        self.frames.last().expect("evaluation result has no frames")
    }
}

/// An in-progress playthrough: the immutable original level plus the move
/// history typed so far.
#[derive(Clone)]
pub struct GameSession<G: GameLogic> {
    pub original: G::State,
    pub moves: Vec<G::Action>,
}

impl<G: GameLogic> GameSession<G> {
    pub fn new(original: G::State) -> Self {
        Self {
            original,
            moves: Vec::new(),
        }
    }

    pub fn evaluate(
        &self,
        engine: &EvaluationEngine<G>,
        logic: &G,
    ) -> Option<std::sync::Arc<EvaluationResult<G::State>>> {
        engine.evaluate(logic, &self.original, &self.moves)
    }

    /// Try to commit one move. Illegal or no-effect moves are rolled back and
    /// reported as `false`; the caller is expected to surface that (error
    /// sound) rather than keep them in history.
    pub fn try_add_move(
        &mut self,
        engine: &EvaluationEngine<G>,
        logic: &G,
        action: G::Action,
    ) -> bool {
        self.moves.push(action);
        if engine.evaluate(logic, &self.original, &self.moves).is_none() {
            self.moves.pop();
            return false;
        }
        true
    }

    /// Remove the last move. The shorter prefix is already memoized, so
    /// re-evaluating after an undo is a cache hit.
    pub fn try_undo(&mut self) -> bool {
        self.moves.pop().is_some()
    }

    /// Record a reset tombstone. History is kept so the reset itself can be
    /// undone; consecutive resets collapse into one.
    pub fn reset(&mut self) {
        let Some(marker) = G::reset_action() else {
            return;
        };
        if !self.moves.is_empty() && *self.moves.last().expect("non-empty") != marker {
            self.moves.push(marker);
        }
    }

    /// Reset that really forgets: clears both the history and the cache.
    pub fn hard_reset(&mut self, engine: &EvaluationEngine<G>) {
        engine.clear();
        self.moves.clear();
    }
}

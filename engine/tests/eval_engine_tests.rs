use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use engine::eval::{encode_actions, trim_to_last_run_after_reset};
use engine::{CachePrimer, EngineConfig, EvaluationEngine, GameLogic, GameSession};

/// A toy deterministic game: the state is the log of applied actions.
/// `X` is always illegal; `B` produces an intermediate frame.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TallyState {
    path: String,
    log: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TallyAction {
    A,
    B,
    X,
    Reset,
}

#[derive(Clone)]
struct TallyLogic {
    applies: Arc<AtomicUsize>,
}

impl TallyLogic {
    fn new() -> Self {
        Self {
            applies: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn apply_count(&self) -> usize {
        self.applies.load(Ordering::SeqCst)
    }
}

impl GameLogic for TallyLogic {
    type State = TallyState;
    type Action = TallyAction;

    fn apply(&self, state: &TallyState, action: TallyAction) -> Option<Vec<TallyState>> {
        self.applies.fetch_add(1, Ordering::SeqCst);
        let suffix = match action {
            TallyAction::A => 'a',
            TallyAction::B => 'b',
            TallyAction::X => return None,
            TallyAction::Reset => unreachable!("reset never reaches apply"),
        };

        let mut frames = Vec::new();
        if action == TallyAction::B {
            let mut pending = state.clone();
            pending.log.push('~');
            frames.push(pending);
        }
        let mut settled = state.clone();
        settled.log.push(suffix);
        frames.push(settled);
        Some(frames)
    }

    fn reset_action() -> Option<TallyAction> {
        Some(TallyAction::Reset)
    }

    fn encode_action(action: TallyAction) -> char {
        match action {
            TallyAction::A => 'A',
            TallyAction::B => 'B',
            TallyAction::X => 'X',
            TallyAction::Reset => panic!("reset is a trim marker, never encoded"),
        }
    }

    fn cache_scope(state: &TallyState) -> &str {
        &state.path
    }
}

fn level(path: &str) -> TallyState {
    TallyState {
        path: path.to_string(),
        log: String::new(),
    }
}

fn quiet_engine() -> EvaluationEngine<TallyLogic> {
    EvaluationEngine::new(EngineConfig { log_timings: false })
}

/// Opt into engine logs with RUST_LOG when debugging a failure.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[test]
fn empty_history_yields_the_level_itself() {
    init_tracing();
    let engine = quiet_engine();
    let logic = TallyLogic::new();

    let result = engine.evaluate(&logic, &level("l"), &[]).unwrap();
    assert_eq!(result.frames.len(), 1);
    assert_eq!(result.last().log, "");
    assert_eq!(logic.apply_count(), 0);
}

#[test]
fn each_unique_prefix_is_computed_at_most_once() {
    let engine = quiet_engine();
    let logic = TallyLogic::new();
    let lvl = level("l");

    use TallyAction::{A, B};
    let moves = [A, B, A, A];

    let result = engine.evaluate(&logic, &lvl, &moves).unwrap();
    assert_eq!(result.last().log, "abaa");
    assert_eq!(logic.apply_count(), 4);

    // Same history again: pure cache hit.
    let again = engine.evaluate(&logic, &lvl, &moves).unwrap();
    assert_eq!(again.last().log, "abaa");
    assert_eq!(logic.apply_count(), 4);

    // Every prefix was memoized on the way.
    for end in 1..=moves.len() {
        engine.evaluate(&logic, &lvl, &moves[..end]).unwrap();
    }
    assert_eq!(logic.apply_count(), 4);
}

#[test]
fn intermediate_frames_are_ordered_and_preserved() {
    let engine = quiet_engine();
    let logic = TallyLogic::new();

    let result = engine
        .evaluate(&logic, &level("l"), &[TallyAction::B])
        .unwrap();
    let logs: Vec<&str> = result.frames.iter().map(|f| f.log.as_str()).collect();
    assert_eq!(logs, vec!["~", "b"]);
}

#[test]
fn illegal_action_returns_none_and_is_not_cached() {
    let engine = quiet_engine();
    let logic = TallyLogic::new();
    let lvl = level("l");

    assert!(engine.evaluate(&logic, &lvl, &[TallyAction::X]).is_none());
    let after_first = logic.apply_count();
    assert!(engine.evaluate(&logic, &lvl, &[TallyAction::X]).is_none());
    // Failures are recomputed, never memoized.
    assert_eq!(logic.apply_count(), after_first + 1);
    assert_eq!(engine.cache_len(), 0);
}

#[test]
fn histories_are_trimmed_to_after_the_last_reset() {
    let engine = quiet_engine();
    let logic = TallyLogic::new();
    let lvl = level("l");

    use TallyAction::{A, B, Reset};
    let with_reset = engine
        .evaluate(&logic, &lvl, &[A, A, Reset, B, A])
        .unwrap();
    let plain = engine.evaluate(&logic, &lvl, &[B, A]).unwrap();
    assert_eq!(with_reset.last(), plain.last());

    // The prefix before the tombstone is ignored entirely, so both spellings
    // share cache entries.
    assert_eq!(engine.cache_len(), 2);
}

#[test]
fn trim_helper_returns_suffix_after_last_reset() {
    use TallyAction::{A, B, Reset};
    let moves = [A, Reset, B, Reset, A, B];
    assert_eq!(trim_to_last_run_after_reset::<TallyLogic>(&moves), &[A, B]);
    assert_eq!(
        trim_to_last_run_after_reset::<TallyLogic>(&[A, B]),
        &[A, B]
    );
    let all_reset = [Reset, Reset];
    assert!(trim_to_last_run_after_reset::<TallyLogic>(&all_reset).is_empty());
}

#[test]
fn encode_actions_concatenates_action_characters() {
    use TallyAction::{A, B};
    assert_eq!(encode_actions::<TallyLogic>(&[A, B, A]), "ABA");
}

#[test]
#[should_panic(expected = "never encoded")]
fn encoding_a_reset_is_an_error() {
    TallyLogic::encode_action(TallyAction::Reset);
}

#[test]
fn cache_only_mode_never_computes() {
    let engine = quiet_engine();
    let logic = TallyLogic::new();
    let lvl = level("l");

    use TallyAction::A;
    assert!(engine.evaluate_cache_only(&logic, &lvl, &[A]).is_none());
    assert_eq!(logic.apply_count(), 0);

    engine.evaluate(&logic, &lvl, &[A]).unwrap();
    let hit = engine.evaluate_cache_only(&logic, &lvl, &[A]).unwrap();
    assert_eq!(hit.last().log, "a");
    assert_eq!(logic.apply_count(), 1);
}

#[test]
fn switching_levels_clears_the_cache() {
    let engine = quiet_engine();
    let logic = TallyLogic::new();

    use TallyAction::A;
    engine.evaluate(&logic, &level("first"), &[A]).unwrap();
    assert_eq!(engine.cache_len(), 1);

    engine.evaluate(&logic, &level("second"), &[A]).unwrap();
    assert_eq!(engine.cache_len(), 1);
    assert_eq!(logic.apply_count(), 2);
}

#[test]
fn session_rolls_back_illegal_moves() {
    let engine = quiet_engine();
    let logic = TallyLogic::new();
    let mut session: GameSession<TallyLogic> = GameSession::new(level("l"));

    assert!(session.try_add_move(&engine, &logic, TallyAction::A));
    assert!(!session.try_add_move(&engine, &logic, TallyAction::X));
    assert_eq!(session.moves, vec![TallyAction::A]);

    let result = session.evaluate(&engine, &logic).unwrap();
    assert_eq!(result.last().log, "a");
}

#[test]
fn session_undo_is_a_cache_hit() {
    let engine = quiet_engine();
    let logic = TallyLogic::new();
    let mut session: GameSession<TallyLogic> = GameSession::new(level("l"));

    session.try_add_move(&engine, &logic, TallyAction::A);
    session.try_add_move(&engine, &logic, TallyAction::B);
    let computed = logic.apply_count();

    assert!(session.try_undo());
    let result = session.evaluate(&engine, &logic).unwrap();
    assert_eq!(result.last().log, "a");
    assert_eq!(logic.apply_count(), computed);

    assert!(session.try_undo());
    assert!(!session.try_undo());
}

#[test]
fn session_reset_appends_a_single_tombstone() {
    let engine = quiet_engine();
    let logic = TallyLogic::new();
    let mut session: GameSession<TallyLogic> = GameSession::new(level("l"));

    // Resetting an empty history records nothing.
    session.reset();
    assert!(session.moves.is_empty());

    session.try_add_move(&engine, &logic, TallyAction::A);
    session.reset();
    session.reset();
    assert_eq!(session.moves, vec![TallyAction::A, TallyAction::Reset]);

    // Undo steps back through the tombstone.
    assert!(session.try_undo());
    let result = session.evaluate(&engine, &logic).unwrap();
    assert_eq!(result.last().log, "a");
}

#[test]
fn hard_reset_forgets_history_and_cache() {
    let engine = quiet_engine();
    let logic = TallyLogic::new();
    let mut session: GameSession<TallyLogic> = GameSession::new(level("l"));

    session.try_add_move(&engine, &logic, TallyAction::A);
    session.try_add_move(&engine, &logic, TallyAction::B);
    assert_eq!(engine.cache_len(), 2);

    session.hard_reset(&engine);
    assert!(session.moves.is_empty());
    assert_eq!(engine.cache_len(), 0);
}

#[test]
fn primer_fills_the_cache_and_joins_cleanly() {
    let engine = Arc::new(quiet_engine());
    let logic = TallyLogic::new();
    let lvl = level("l");

    use TallyAction::{A, B};
    let script = vec![A, B, A, B, A];

    let primer = CachePrimer::spawn(
        Arc::clone(&engine),
        logic.clone(),
        lvl.clone(),
        script.clone(),
    );

    // The interactive side evaluates concurrently; both agree afterwards.
    let interactive = engine.evaluate(&logic, &lvl, &script).unwrap();
    primer.stop();

    assert_eq!(interactive.last().log, "ababa");
    assert_eq!(engine.cache_len(), script.len());
    // Races may duplicate work, but never more than once per prefix here.
    assert!(logic.apply_count() <= script.len() * 2);
}

#[test]
fn primer_cancellation_is_prompt() {
    let engine = Arc::new(quiet_engine());
    let logic = TallyLogic::new();

    let script = vec![TallyAction::A; 64];
    let primer = CachePrimer::spawn(Arc::clone(&engine), logic.clone(), level("l"), script);
    // Dropping requests cancellation and joins; no hang, no panic.
    drop(primer);
}

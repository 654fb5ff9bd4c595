//! The session state machine.
//!
//! `GameEngine` owns the in-memory session mapping, the durable store, and
//! the content generator. Every operation runs under the router's per-user
//! gate, so mutations of a single user's session are linearized; the engine
//! itself only coordinates generation, mutation, and persistence.
//!
//! Persistence failures never abort an operation: the store logs and the
//! game continues in memory (losing durability, not correctness).

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::generator::{GenerationError, RoomContent, RoomGenerator};
use crate::session::{FileSessionStore, Session, Sessions};

// ============================================================================
// Operation results
// ============================================================================

/// A room as shown to the player. The solution stays server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomView {
    pub room_number: u32,
    pub description: String,
    pub buggy_snippet: String,
}

impl RoomView {
    fn of(session: &Session) -> Self {
        Self {
            room_number: session.room_number,
            description: session.description.clone(),
            buggy_snippet: session.buggy_snippet.clone(),
        }
    }
}

/// Result of entering the castle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnterOutcome {
    /// A new session was created at room 1.
    Entered(RoomView),
    /// The user already had a live session; its current room is re-presented.
    Resumed(RoomView),
}

/// Result of a solution submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The submission did not match; the attempt counter was bumped.
    Incorrect { attempts: u32 },
    /// Correct; the session moved to the next room.
    Advanced(RoomView),
    /// Correct in the final room; the session is over and deleted.
    Victory,
    /// Correct, but the next room could not be generated. The session was
    /// deleted rather than left half-advanced.
    FatalFailure,
}

/// Read-only progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub room_number: u32,
    pub attempts: u32,
    pub final_room: u32,
}

// ============================================================================
// Engine
// ============================================================================

/// Per-user game state machine.
pub struct GameEngine {
    sessions: Sessions,
    store: FileSessionStore,
    generator: Arc<dyn RoomGenerator>,
    final_room: u32,
    // Serializes snapshot-and-write as one step. The per-user gate only
    // linearizes same-user operations; without this, a stale snapshot
    // taken by one user's operation could overwrite another user's
    // already-persisted mutation.
    persist_lock: Mutex<()>,
}

impl GameEngine {
    pub fn new(
        sessions: Sessions,
        store: FileSessionStore,
        generator: Arc<dyn RoomGenerator>,
        final_room: u32,
    ) -> Self {
        Self {
            sessions,
            store,
            generator,
            final_room,
            persist_lock: Mutex::new(()),
        }
    }

    /// Start a new session, or re-present the current room if one is live.
    ///
    /// On a generation failure no session is created and the error is
    /// returned; the caller reports it as a service problem, not a user
    /// mistake.
    pub async fn enter_castle(&self, user_id: i64) -> Result<EnterOutcome, GenerationError> {
        if let Some(session) = self.sessions.get(user_id).await {
            if session.is_active() {
                info!(user = user_id, room = session.room_number, "resuming session");
                return Ok(EnterOutcome::Resumed(RoomView::of(&session)));
            }
            // A completed session that was never cleaned up does not block
            // a fresh game.
            self.sessions.remove(user_id).await;
        }

        let room = self.generator.generate_room(1, None).await?;
        let session = Session::first_room(user_id, room);
        let view = RoomView::of(&session);
        self.sessions.insert(session).await;
        self.persist().await;
        info!(user = user_id, "session started");
        Ok(EnterOutcome::Entered(view))
    }

    /// Judge a submission against the current room's solution.
    ///
    /// Comparison is whitespace-insensitive and case-sensitive, exactly as
    /// the original game judged it. Returns `None` without an active
    /// session.
    pub async fn submit_solution(
        &self,
        user_id: i64,
        submitted: &str,
    ) -> Option<SubmissionOutcome> {
        let mut session = self.active_session(user_id).await?;

        if normalize_code(submitted) != normalize_code(&session.correct_snippet) {
            session.attempts += 1;
            let attempts = session.attempts;
            self.sessions.insert(session).await;
            self.persist().await;
            return Some(SubmissionOutcome::Incorrect { attempts });
        }

        if session.room_number >= self.final_room {
            info!(user = user_id, room = session.room_number, "castle escaped");
            self.delete(user_id).await;
            return Some(SubmissionOutcome::Victory);
        }

        let prior = RoomContent {
            description: session.description.clone(),
            buggy_snippet: session.buggy_snippet.clone(),
            correct_snippet: session.correct_snippet.clone(),
        };
        match self
            .generator
            .generate_room(session.room_number + 1, Some(&prior))
            .await
        {
            Ok(room) => {
                session.advance(room);
                let view = RoomView::of(&session);
                self.sessions.insert(session).await;
                self.persist().await;
                info!(user = user_id, room = view.room_number, "advanced");
                Some(SubmissionOutcome::Advanced(view))
            }
            Err(e) => {
                warn!(
                    user = user_id,
                    room = session.room_number + 1,
                    error = %e,
                    "room generation failed mid-advance, ending session"
                );
                self.delete(user_id).await;
                Some(SubmissionOutcome::FatalFailure)
            }
        }
    }

    /// Ask the generator for a hint on the current room.
    ///
    /// Never mutates the session. Returns `None` without an active session.
    pub async fn request_hint(&self, user_id: i64) -> Option<Result<String, GenerationError>> {
        let session = self.active_session(user_id).await?;
        let room = RoomContent {
            description: session.description,
            buggy_snippet: session.buggy_snippet,
            correct_snippet: session.correct_snippet,
        };
        Some(self.generator.generate_hint(&room).await)
    }

    /// Reveal the current room's solution (the hidden god-mode command).
    pub async fn reveal_solution(&self, user_id: i64) -> Option<String> {
        let session = self.active_session(user_id).await?;
        Some(session.correct_snippet)
    }

    /// Delete the user's session unconditionally.
    ///
    /// Idempotent: returns whether a session existed.
    pub async fn terminate(&self, user_id: i64) -> bool {
        let _persist = self.persist_lock.lock().await;
        if self.sessions.remove(user_id).await.is_some() {
            if let Err(e) = self.store.delete(user_id).await {
                warn!(user = user_id, error = %e, "failed to remove session from store");
            }
            info!(user = user_id, "session terminated");
            true
        } else {
            false
        }
    }

    /// Read-only progress for the user.
    pub async fn inspect(&self, user_id: i64) -> Option<Progress> {
        let session = self.active_session(user_id).await?;
        Some(Progress {
            room_number: session.room_number,
            attempts: session.attempts,
            final_room: self.final_room,
        })
    }

    /// Write the final state before the process exits.
    pub async fn shutdown(&self) {
        let _persist = self.persist_lock.lock().await;
        let sessions = self.sessions.snapshot().await;
        info!(sessions = sessions.len(), "saving sessions before shutdown");
        if let Err(e) = self.store.save_all(&sessions).await {
            warn!(error = %e, "final session save failed");
        }
    }

    async fn active_session(&self, user_id: i64) -> Option<Session> {
        self.sessions.get(user_id).await.filter(Session::is_active)
    }

    async fn persist(&self) {
        let _persist = self.persist_lock.lock().await;
        let snapshot = self.sessions.snapshot().await;
        if let Err(e) = self.store.save_all(&snapshot).await {
            warn!(error = %e, "failed to persist sessions, continuing in memory");
        }
    }

    async fn delete(&self, user_id: i64) {
        let _persist = self.persist_lock.lock().await;
        self.sessions.remove(user_id).await;
        if let Err(e) = self.store.delete(user_id).await {
            warn!(user = user_id, error = %e, "failed to remove session from store");
        }
    }
}

/// Strip all whitespace for comparison.
///
/// Deliberately the only normalization applied to submissions; semantic
/// code equivalence is out of scope and the case-sensitive exact match must
/// be preserved for compatibility.
pub fn normalize_code(code: &str) -> String {
    code.split_whitespace().collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    struct ScriptedGenerator {
        rooms: Mutex<VecDeque<Result<RoomContent, GenerationError>>>,
        hints: Mutex<VecDeque<Result<String, GenerationError>>>,
    }

    impl ScriptedGenerator {
        fn new(
            rooms: Vec<Result<RoomContent, GenerationError>>,
            hints: Vec<Result<String, GenerationError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                rooms: Mutex::new(rooms.into()),
                hints: Mutex::new(hints.into()),
            })
        }
    }

    #[async_trait]
    impl RoomGenerator for ScriptedGenerator {
        async fn generate_room(
            &self,
            _room_number: u32,
            _prior: Option<&RoomContent>,
        ) -> Result<RoomContent, GenerationError> {
            self.rooms.lock().await.pop_front().unwrap_or_else(|| {
                Err(GenerationError::Api {
                    status: 503,
                    message: "script exhausted".to_string(),
                })
            })
        }

        async fn generate_hint(&self, _room: &RoomContent) -> Result<String, GenerationError> {
            self.hints.lock().await.pop_front().unwrap_or_else(|| {
                Err(GenerationError::Api {
                    status: 503,
                    message: "script exhausted".to_string(),
                })
            })
        }
    }

    fn room(n: u32) -> RoomContent {
        RoomContent {
            description: format!("hall {n}"),
            buggy_snippet: format!("spell_power = {n}\nprint(spell_powr)"),
            correct_snippet: format!("spell_power = {n}\nprint(spell_power)"),
        }
    }

    fn gen_failure() -> GenerationError {
        GenerationError::Api {
            status: 500,
            message: "the castle shudders".to_string(),
        }
    }

    fn engine_with(
        temp_dir: &TempDir,
        generator: Arc<dyn RoomGenerator>,
        final_room: u32,
    ) -> GameEngine {
        GameEngine::new(
            Sessions::new(),
            FileSessionStore::new(temp_dir.path().join("sessions.json")),
            generator,
            final_room,
        )
    }

    #[test]
    fn normalize_strips_all_whitespace() {
        assert_eq!(normalize_code("x = 1\n"), "x=1");
        assert_eq!(normalize_code("  def f():\n\treturn 1 "), "deff():return1");
        assert_eq!(normalize_code("x=1"), normalize_code("x = 1\n"));
    }

    #[test]
    fn normalize_is_case_sensitive() {
        assert_ne!(normalize_code("X = 1"), normalize_code("x = 1"));
    }

    #[tokio::test]
    async fn enter_creates_session_at_room_one() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine_with(&temp_dir, ScriptedGenerator::new(vec![Ok(room(1))], vec![]), 5);

        let outcome = engine.enter_castle(42).await.unwrap();
        match outcome {
            EnterOutcome::Entered(view) => {
                assert_eq!(view.room_number, 1);
                assert_eq!(view.description, "hall 1");
            }
            other => panic!("expected Entered, got {other:?}"),
        }

        let progress = engine.inspect(42).await.unwrap();
        assert_eq!(progress.room_number, 1);
        assert_eq!(progress.attempts, 0);
    }

    #[tokio::test]
    async fn enter_with_live_session_resumes_without_generation() {
        let temp_dir = TempDir::new().unwrap();
        // Only one room is scripted: a second generation attempt would fail.
        let engine = engine_with(&temp_dir, ScriptedGenerator::new(vec![Ok(room(1))], vec![]), 5);

        engine.enter_castle(42).await.unwrap();
        let outcome = engine.enter_castle(42).await.unwrap();

        match outcome {
            EnterOutcome::Resumed(view) => assert_eq!(view.room_number, 1),
            other => panic!("expected Resumed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn enter_failure_creates_no_session() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine_with(
            &temp_dir,
            ScriptedGenerator::new(vec![Err(gen_failure())], vec![]),
            5,
        );

        assert!(engine.enter_castle(42).await.is_err());
        assert!(engine.inspect(42).await.is_none());
    }

    #[tokio::test]
    async fn correct_submission_advances_and_resets_attempts() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine_with(
            &temp_dir,
            ScriptedGenerator::new(vec![Ok(room(1)), Ok(room(2))], vec![]),
            5,
        );

        engine.enter_castle(42).await.unwrap();
        // Miss once so the reset is observable.
        engine.submit_solution(42, "wrong").await.unwrap();

        let outcome = engine
            .submit_solution(42, &room(1).correct_snippet)
            .await
            .unwrap();
        match outcome {
            SubmissionOutcome::Advanced(view) => {
                assert_eq!(view.room_number, 2);
                assert_eq!(view.description, "hall 2");
            }
            other => panic!("expected Advanced, got {other:?}"),
        }

        let progress = engine.inspect(42).await.unwrap();
        assert_eq!(progress.room_number, 2);
        assert_eq!(progress.attempts, 0);
    }

    #[tokio::test]
    async fn submission_matching_modulo_whitespace_is_accepted() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine_with(
            &temp_dir,
            ScriptedGenerator::new(vec![Ok(room(1)), Ok(room(2))], vec![]),
            5,
        );

        engine.enter_castle(42).await.unwrap();
        let reshaped = format!("  {}  \n", room(1).correct_snippet.replace('\n', "   \n\t"));
        let outcome = engine.submit_solution(42, &reshaped).await.unwrap();
        assert!(matches!(outcome, SubmissionOutcome::Advanced(_)));
    }

    #[tokio::test]
    async fn wrong_submission_increments_attempts_only() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine_with(&temp_dir, ScriptedGenerator::new(vec![Ok(room(1))], vec![]), 5);

        engine.enter_castle(42).await.unwrap();
        let outcome = engine.submit_solution(42, "WRONG").await.unwrap();
        assert_eq!(outcome, SubmissionOutcome::Incorrect { attempts: 1 });

        let progress = engine.inspect(42).await.unwrap();
        assert_eq!(progress.room_number, 1);
        assert_eq!(progress.attempts, 1);
    }

    #[tokio::test]
    async fn victory_in_final_room_deletes_session() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine_with(
            &temp_dir,
            ScriptedGenerator::new(vec![Ok(room(1)), Ok(room(2))], vec![]),
            2,
        );

        engine.enter_castle(42).await.unwrap();
        engine
            .submit_solution(42, &room(1).correct_snippet)
            .await
            .unwrap();

        let outcome = engine
            .submit_solution(42, &room(2).correct_snippet)
            .await
            .unwrap();
        assert_eq!(outcome, SubmissionOutcome::Victory);
        assert!(engine.inspect(42).await.is_none());
        assert!(engine.submit_solution(42, "anything").await.is_none());
    }

    #[tokio::test]
    async fn failed_advance_deletes_session() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine_with(
            &temp_dir,
            ScriptedGenerator::new(vec![Ok(room(1)), Err(gen_failure())], vec![]),
            5,
        );

        engine.enter_castle(42).await.unwrap();
        let outcome = engine
            .submit_solution(42, &room(1).correct_snippet)
            .await
            .unwrap();

        assert_eq!(outcome, SubmissionOutcome::FatalFailure);
        assert!(engine.inspect(42).await.is_none());

        // Not resurrected from disk either.
        let store = FileSessionStore::new(temp_dir.path().join("sessions.json"));
        assert!(!store.load_all().await.contains_key(&42));
    }

    #[tokio::test]
    async fn concurrent_cross_user_mutations_all_reach_disk() {
        let temp_dir = TempDir::new().unwrap();
        let engine = Arc::new(engine_with(
            &temp_dir,
            ScriptedGenerator::new(vec![Ok(room(1)), Ok(room(1))], vec![]),
            5,
        ));

        engine.enter_castle(1).await.unwrap();
        engine.enter_castle(2).await.unwrap();

        // Interleave mutations for distinct users; each round's writes must
        // both land on disk, in either order.
        let rounds: u32 = 20;
        for _ in 0..rounds {
            let a = tokio::spawn({
                let engine = engine.clone();
                async move { engine.submit_solution(1, "wrong").await }
            });
            let b = tokio::spawn({
                let engine = engine.clone();
                async move { engine.submit_solution(2, "wrong").await }
            });
            a.await.unwrap().unwrap();
            b.await.unwrap().unwrap();
        }

        let store = FileSessionStore::new(temp_dir.path().join("sessions.json"));
        let loaded = store.load_all().await;
        assert_eq!(loaded[&1].attempts, rounds);
        assert_eq!(loaded[&2].attempts, rounds);
    }

    #[tokio::test]
    async fn room_numbers_increase_by_one_per_advance() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine_with(
            &temp_dir,
            ScriptedGenerator::new(vec![Ok(room(1)), Ok(room(2)), Ok(room(3))], vec![]),
            5,
        );

        engine.enter_castle(42).await.unwrap();
        let mut seen = vec![engine.inspect(42).await.unwrap().room_number];
        for n in 1..=2 {
            engine
                .submit_solution(42, &room(n).correct_snippet)
                .await
                .unwrap();
            seen.push(engine.inspect(42).await.unwrap().room_number);
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn hint_does_not_mutate_session() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine_with(
            &temp_dir,
            ScriptedGenerator::new(
                vec![Ok(room(1))],
                vec![Ok("listen to the ghost".to_string()), Err(gen_failure())],
            ),
            5,
        );

        engine.enter_castle(42).await.unwrap();
        engine.submit_solution(42, "wrong").await.unwrap();
        let before = engine.inspect(42).await.unwrap();

        let hint = engine.request_hint(42).await.unwrap();
        assert_eq!(hint.unwrap(), "listen to the ghost");

        let failed = engine.request_hint(42).await.unwrap();
        assert!(failed.is_err());

        assert_eq!(engine.inspect(42).await.unwrap(), before);
    }

    #[tokio::test]
    async fn hint_without_session_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine_with(&temp_dir, ScriptedGenerator::new(vec![], vec![]), 5);
        assert!(engine.request_hint(42).await.is_none());
    }

    #[tokio::test]
    async fn reveal_solution_returns_correct_snippet() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine_with(&temp_dir, ScriptedGenerator::new(vec![Ok(room(1))], vec![]), 5);

        assert!(engine.reveal_solution(42).await.is_none());
        engine.enter_castle(42).await.unwrap();
        assert_eq!(
            engine.reveal_solution(42).await.unwrap(),
            room(1).correct_snippet
        );
    }

    #[tokio::test]
    async fn terminate_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine_with(&temp_dir, ScriptedGenerator::new(vec![Ok(room(1))], vec![]), 5);

        engine.enter_castle(42).await.unwrap();
        assert!(engine.terminate(42).await);
        assert!(!engine.terminate(42).await);
        assert!(engine.inspect(42).await.is_none());
    }
}

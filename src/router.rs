//! Event dispatch with per-user concurrency gating.
//!
//! The router is the single entry point for inbound user events. It claims
//! the user's gate before touching the state machine; if the claim fails
//! the event is answered with [`Outcome::Busy`] immediately - no queuing,
//! no waiting. The gate is released when the dispatched operation finishes,
//! on success and failure alike.
//!
//! Every error produced below this boundary is converted to an [`Outcome`]
//! here; nothing propagates past the router.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::{EnterOutcome, GameEngine, SubmissionOutcome};
use crate::sync::UserGates;

// ============================================================================
// Events and outcomes
// ============================================================================

/// An inbound user event, abstracted from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Start a new game, or return to the current room.
    EnterCastle,
    /// Ask the ghosts for a hint.
    RequestHint,
    /// Leave the castle, deleting the session.
    LeaveGame,
    /// Show the progress scroll.
    ShowProgress,
    /// Reveal the solution (hidden god-mode command).
    RevealSolution,
    /// Free-text message, judged as a solution attempt.
    Submission(String),
}

/// The outbound result of dispatching one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A room to present, on entering or re-entering the castle.
    RoomPresented {
        room_number: u32,
        description: String,
        buggy_snippet: String,
    },
    /// A hint from the ghosts.
    HintGiven(String),
    /// The hint generator failed; the session is untouched.
    HintUnavailable,
    /// Verdict on a solution attempt.
    Submission(SubmissionOutcome),
    /// Progress scroll contents.
    ProgressReport {
        room_number: u32,
        attempts: u32,
        final_room: u32,
    },
    /// The current room's solution (god mode).
    SolutionRevealed(String),
    /// Starting a game failed because no room could be generated.
    GenerationFailed,
    /// The session was deleted on request.
    Departed,
    /// An operation for this user is already in flight.
    Busy,
    /// The event needs an active session and there is none.
    NoActiveSession,
}

// ============================================================================
// Router
// ============================================================================

/// Dispatches events to the engine under the per-user gate.
#[derive(Clone)]
pub struct Router {
    engine: Arc<GameEngine>,
    gates: UserGates,
}

impl Router {
    pub fn new(engine: Arc<GameEngine>) -> Self {
        Self {
            engine,
            gates: UserGates::new(),
        }
    }

    /// Handle one event for one user.
    ///
    /// At most one dispatch per user runs at a time; concurrent dispatches
    /// for distinct users proceed in parallel.
    pub async fn dispatch(&self, user_id: i64, event: Event) -> Outcome {
        // The guard stays alive across every await below; dropping it on
        // any exit path releases the user.
        let Some(_busy) = self.gates.try_claim(user_id) else {
            debug!(user = user_id, "operation already in flight, rejecting");
            return Outcome::Busy;
        };

        match event {
            Event::EnterCastle => match self.engine.enter_castle(user_id).await {
                Ok(EnterOutcome::Entered(view)) | Ok(EnterOutcome::Resumed(view)) => {
                    Outcome::RoomPresented {
                        room_number: view.room_number,
                        description: view.description,
                        buggy_snippet: view.buggy_snippet,
                    }
                }
                Err(e) => {
                    warn!(user = user_id, error = %e, "could not open the castle gate");
                    Outcome::GenerationFailed
                }
            },

            Event::RequestHint => match self.engine.request_hint(user_id).await {
                Some(Ok(hint)) => Outcome::HintGiven(hint),
                Some(Err(e)) => {
                    warn!(user = user_id, error = %e, "hint generation failed");
                    Outcome::HintUnavailable
                }
                None => Outcome::NoActiveSession,
            },

            Event::LeaveGame => {
                if self.engine.terminate(user_id).await {
                    Outcome::Departed
                } else {
                    Outcome::NoActiveSession
                }
            }

            Event::ShowProgress => match self.engine.inspect(user_id).await {
                Some(progress) => Outcome::ProgressReport {
                    room_number: progress.room_number,
                    attempts: progress.attempts,
                    final_room: progress.final_room,
                },
                None => Outcome::NoActiveSession,
            },

            Event::RevealSolution => match self.engine.reveal_solution(user_id).await {
                Some(solution) => Outcome::SolutionRevealed(solution),
                None => Outcome::NoActiveSession,
            },

            Event::Submission(text) => match self.engine.submit_solution(user_id, &text).await {
                Some(outcome) => Outcome::Submission(outcome),
                None => Outcome::NoActiveSession,
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Task lifecycle constants and state machine.
//!
//! This module lives in `core` (zero internal deps) so it can be used by both
//! the API/repository layer and any future worker or CLI tooling.

// ---------------------------------------------------------------------------
// Admission constants
// ---------------------------------------------------------------------------

/// Maximum number of concurrently InProgress tasks attributed to one user.
/// Orchestrator-category tasks do not count toward this cap.
pub const MAX_CONCURRENT_TASKS_PER_USER: i64 = 5;

/// Heartbeat age in seconds beyond which a worker is considered gone.
pub const WORKER_LIVENESS_WINDOW_SECS: i64 = 90;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Task status IDs matching `task_statuses` seed data (1-based SMALLSERIAL).
///
/// The state machine is intentionally duplicated from the `db` crate's
/// `TaskStatus` enum because `core` must have zero internal deps.
pub mod state_machine {
    /// Returns the set of valid target status IDs reachable from `from_status`.
    ///
    /// Terminal states (Complete=3, Failed=4, Cancelled=5) return an empty
    /// slice because no further transitions are allowed.
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            // Queued -> InProgress, Cancelled
            1 => &[2, 5],
            // InProgress -> Complete, Failed, Cancelled
            2 => &[3, 4, 5],
            // Terminal states: Complete, Failed, Cancelled
            3 | 4 | 5 => &[],
            // Unknown status: no transitions allowed
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: i16, to: i16) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Validate a state transition, returning an error message for invalid ones.
    pub fn validate_transition(from: i16, to: i16) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            let from_name = status_name(from);
            let to_name = status_name(to);
            Err(format!(
                "Invalid transition: {from_name} ({from}) -> {to_name} ({to})"
            ))
        }
    }

    /// Whether a status ID is terminal (no outgoing transitions).
    pub fn is_terminal(status: i16) -> bool {
        matches!(status, 3..=5)
    }

    /// Human-readable name for a status ID (for error messages).
    fn status_name(id: i16) -> &'static str {
        match id {
            1 => "Queued",
            2 => "InProgress",
            3 => "Complete",
            4 => "Failed",
            5 => "Cancelled",
            _ => "Unknown",
        }
    }
}

//! Sorting control module
//!
//! Decides, frame by frame, when an object on the belt has been seen
//! consistently enough to act on, and which stored movement sorts it. The
//! blocking side of a pick cycle (stopping the belt, running the movement,
//! clearing and verifying the pick area) is driven by [`run_sort_loop`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod debounce;
mod params;
mod rules;
mod runner;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use debounce::*;
pub use params::*;
pub use rules::*;
pub use runner::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during SortCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum SortCtrlError {
    #[error("Invalid sort control parameters: {0}")]
    InvalidParams(String),

    #[error("SortCtrl has not been initialised")]
    NotInitialised,

    #[error("Cannot {action} while in state {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: SortState,
    },
}

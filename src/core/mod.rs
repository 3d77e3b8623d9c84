//! Injectable providers.
//!
//! Everything nondeterministic the engine touches (wall time, target draws)
//! enters through a trait defined here, so tests can substitute fixed values.

pub mod clock;
pub mod rng;

// Re-export core types
pub use clock::{Clock, ManualClock, SystemClock};
pub use rng::{DeterministicRng, RandomTargets, SequenceTargets, TargetSource};

//! Track sequencing, transitions and failure recovery

pub mod controller;
pub mod deck;
pub mod recovery;
pub mod session;

pub use controller::{ControlCommand, TransitionController};
pub use deck::DeckShuffler;
pub use recovery::{ErrorRecovery, RecoveryAction};
pub use session::{PlaybackSession, SessionId};

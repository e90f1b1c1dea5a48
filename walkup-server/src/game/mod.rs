//! Game control: the "next batter" state machine and the playback
//! capability it drives.

pub mod controller;
pub mod dispatcher;

pub use controller::{AdvanceOutcome, GameController, GameState, GameStatus};
pub use dispatcher::PlaybackDispatcher;

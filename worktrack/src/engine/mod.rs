//! Session engine: the per-card work-session state machine and the board
//! controller that owns the card list.

mod board;
mod card;
mod state;

pub use board::Board;
pub use card::CardSession;
pub use state::{FieldError, SessionState};

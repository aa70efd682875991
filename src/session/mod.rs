pub mod progression;
pub mod state;
pub mod store;

pub use progression::{Phase, Session, Signal};
pub use state::{Outcome, PlayerRecord};
pub use store::SaveStore;

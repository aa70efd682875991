pub mod loader;
pub mod types;

pub use loader::{default_catalog, load_catalog};
pub use types::{Catalog, LOBBY_FLOOR};

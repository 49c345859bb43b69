pub mod commands;
pub mod ids;
pub mod store;

pub use commands::{Applied, CommandError, DocumentCommand, Outcome, apply_command};
pub use ids::{IdGenerator, SequentialIds};
pub use store::{DocumentStore, StoreConfig};

pub mod file_id;
pub mod store;

pub use file_id::FileId;
pub use store::{derive_key, PositionState, PositionStore, StateError};

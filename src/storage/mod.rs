pub mod saved_state;

pub use saved_state::{SavedStateStore, DEFAULT_STATE_DIR};

pub mod tuner;

pub use tuner::{TunableStatus, Tuner, UUIDD_SOCKET};

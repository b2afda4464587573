mod role;

pub use role::{Rights, Role};

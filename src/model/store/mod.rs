mod collection;
mod id;

pub use collection::{Coll, Record, Store, StoreError};
pub use id::Id;

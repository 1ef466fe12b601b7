pub mod cache;
pub mod clock;
pub mod error;
pub mod store;

pub use cache::{CACHE_VERSION, Cache, Stamped};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::StoreError;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};

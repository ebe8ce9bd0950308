//! Read-through cache of printing metadata and artwork, stored inside the
//! project directory

mod inflight;
mod store;

pub use inflight::InFlight;
pub use store::{CacheStore, CardCacheEntry, ImageBlob, MaterializedImage};

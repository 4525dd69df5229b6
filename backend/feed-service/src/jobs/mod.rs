pub mod cache_warmer;

pub use cache_warmer::{run_warm_cycle, CacheWarmerConfig};

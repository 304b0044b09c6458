//! Tiered Cache - a three-tier cache manager
//!
//! Layers a hot LRU tier and a warm TTL tier in front of a shared remote
//! (Redis) tier, with promotion, background maintenance, memoization and
//! Prometheus instrumentation.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheManager, CacheValue, SetOptions};
pub use config::{Config, RemoteBackend};
pub use error::{CacheError, Result};
pub use tasks::{spawn_background_tasks, BackgroundTasks};

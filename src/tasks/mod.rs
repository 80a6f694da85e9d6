//! Background Tasks Module
//!
//! # Tasks
//! - Cache cleanup: sweeps expired entries from the memory cache backend

mod cleanup;

pub use cleanup::spawn_cleanup_task;

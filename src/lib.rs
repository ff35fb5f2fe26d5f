//! # sovran-concurrent-map
//!
//! A thread-safe map guarded by a reader/writer lock.
//!
//! `sovran-concurrent-map` targets the "many readers, occasional writers"
//! pattern: any number of threads may read at once, while a write excludes
//! everyone else for its duration. Every operation is atomic on its own, and
//! the bulk accessors (`keys`, `elems`, `to_map`, formatting) return snapshots
//! taken at a single instant.
//!
//! ## Key Features
//!
//! - **Thread-safe**: Built on `RwLock<HashMap<_, _>>`; share it with `Arc`
//! - **Explicit absence**: Lookups return `Option`, never a zero value
//! - **Runtime typing when needed**: `AnyConcurrentMap` checks keys and values
//!   against type descriptors fixed at construction
//! - **Sharding**: `ShardedConcurrentMap` spreads keys over independently
//!   locked segments with the same contract
//!
//! ## Usage Examples
//!
//! ### Basic Usage
//!
//! ```rust
//! use sovran_concurrent_map::{ConcurrentMap, MapError};
//!
//! fn main() -> Result<(), MapError> {
//!     let map = ConcurrentMap::<String, i32>::new();
//!
//!     // put returns whatever was stored before
//!     assert_eq!(map.put("a".to_string(), 1)?, None);
//!     assert_eq!(map.put("a".to_string(), 2)?, Some(1));
//!
//!     // lookups accept borrowed keys
//!     assert_eq!(map.get("a")?, Some(2));
//!     assert_eq!(map.get("missing")?, None);
//!
//!     assert_eq!(map.remove("a")?, Some(2));
//!     assert!(map.is_empty()?);
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Sharing Between Threads
//!
//! ```rust
//! use sovran_concurrent_map::{ConcurrentMap, MapError};
//! use std::sync::Arc;
//! use std::thread;
//!
//! fn main() -> Result<(), MapError> {
//!     let map = Arc::new(ConcurrentMap::<u32, String>::new());
//!
//!     let handles: Vec<_> = (0..4)
//!         .map(|worker| {
//!             let map = Arc::clone(&map);
//!             thread::spawn(move || -> Result<(), MapError> {
//!                 for i in 0..10 {
//!                     map.put(worker * 100 + i, format!("worker {}", worker))?;
//!                 }
//!                 Ok(())
//!             })
//!         })
//!         .collect();
//!
//!     for handle in handles {
//!         handle.join().expect("worker panicked")?;
//!     }
//!
//!     assert_eq!(map.len()?, 40);
//!     Ok(())
//! }
//! ```
//!
//! ### Snapshots
//!
//! ```rust
//! use sovran_concurrent_map::{ConcurrentMap, MapError};
//!
//! let map = ConcurrentMap::<&str, i32>::new();
//! map.put("x", 1)?;
//!
//! let mut copy = map.to_map()?;
//! copy.insert("y", 2);
//! map.put("z", 3)?;
//!
//! // neither side sees the other's changes
//! assert!(!map.contains("y")?);
//! assert!(!copy.contains_key("z"));
//! # Ok::<(), MapError>(())
//! ```
//!
//! ### Runtime-Typed Maps
//!
//! ```rust
//! use sovran_concurrent_map::{AnyConcurrentMap, MapError, TypeDescriptor};
//!
//! let map = AnyConcurrentMap::new(TypeDescriptor::of::<String>(), TypeDescriptor::of::<i32>());
//!
//! map.put("a".to_string(), 1)?;
//! match map.put(42u8, 1) {
//!     Ok(_) => println!("stored"),
//!     Err(MapError::TypeMismatch { expected, found }) => {
//!         println!("expected {}, found {}", expected, found)
//!     }
//!     Err(e) => println!("Other error: {}", e),
//! }
//! assert_eq!(map.len()?, 1);
//! # Ok::<(), MapError>(())
//! ```

mod any_map;
mod any_value;
mod descriptor;
mod error;
mod map;
mod render;
mod sharded;

pub use any_map::AnyConcurrentMap;
pub use any_value::{DynKey, DynValue};
pub use descriptor::TypeDescriptor;
pub use error::MapError;
pub use map::ConcurrentMap;
pub use sharded::{ShardedConcurrentMap, DEFAULT_SHARDS};

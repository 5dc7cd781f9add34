//! Object-storage path resolution for Emberflow targets.
//!
//! Targets address objects by canonical `scheme://bucket/key` URIs. A
//! [`StoreConfig`] decides, once, at construction time, whether operations
//! hit the real object store or a local filesystem mirror: when the config
//! carries a local root (usually from the `LOCAL_S3_PATH` environment
//! variable) the scheme is stripped and the rest of the path is joined
//! under that root. The remote side is a narrow [`ObjectStore`] trait the
//! workflow engine implements; [`MemoryStore`] stands in for tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use emberflow_store::{MemoryStore, StoreConfig, StoreTarget};
//!
//! let target = StoreTarget::from_uri(
//!     "s3://reports/2024/out.csv",
//!     StoreConfig::from_env(),
//!     std::sync::Arc::new(MemoryStore::new()),
//! )?;
//!
//! let mut writer = target.writer()?;
//! // ... write bytes ...
//! writer.finish()?;
//! ```

mod config;
mod error;
mod object_store;
mod target;
mod uri;

pub use config::{StoreConfig, LOCAL_S3_PATH};
pub use error::{Result, StoreError};
pub use object_store::{MemoryStore, ObjectStore};
pub use target::{OpenMode, StoreTarget, TargetHandle, TargetReader, TargetWriter};
pub use uri::StoreUri;

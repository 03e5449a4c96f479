//! Infrastructure layer: blob storage, path layout, pagination and the job
//! record store built on top of them.

pub mod blob;
pub mod codec;
pub mod config;
pub mod pagination;
pub mod paths;
pub mod records;

#[cfg(test)]
mod integration_tests;

pub use blob::{BlobStore, BlobStoreError, DirOutcome, FsBlobStore, InMemoryBlobStore};
pub use codec::{CodecError, JsonCodec, MetadataCodec};
pub use config::{ConfigError, StoreConfig};
pub use pagination::{Direction, paginate};
pub use paths::{PathScheme, RecordKind};
pub use records::{JobLogging, JobRecordStore, LOG_SEPARATOR, RecordStoreError};

//! Object-storage backends for scan artifacts.
//!
//! One `Storage` handle per bucket (originals and previews are separate
//! buckets). The `exists` method is the storage existence oracle: it is the
//! only thing allowed to gate `original_ready`, and it answers from the
//! storage service's own record of objects, never from upload responses.

pub mod factory;
pub mod local;
pub mod s3;
pub mod traits;

pub use facet_core::StorageBackend;
pub use factory::create_storage;
pub use local::LocalStorage;
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};

//! Core types for the Facet scan-ingestion system.
//!
//! This crate holds everything shared between the API server, the API client,
//! and the device sync engine: the error taxonomy, configuration, canonical
//! storage-path derivation, and the protocol DTOs.

pub mod config;
pub mod error;
pub mod models;
pub mod paths;

pub use config::{Config, StorageBackend};
pub use error::{AppError, ConflictKind, ErrorMetadata, LogLevel};
pub use paths::{object_path, path_owned_by, validate_coordinate, SlotPaths};

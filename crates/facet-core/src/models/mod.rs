//! Domain model types shared across the workspace.

pub mod image;
pub mod job;
pub mod protocol;

pub use image::{ImageKind, ImageType, SignedUrlMode};
pub use job::{JobAction, JobStatus};
pub use protocol::*;

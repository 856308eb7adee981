pub mod downloads;
pub mod health;
pub mod ingest;
pub mod jobs;
pub mod signed_urls;

//! Database layer for the scan-ingestion ledger.
//!
//! Repositories wrap a `PgPool` and expose the queries the API handlers
//! need. All writes are idempotent or guarded: rings upsert, diamonds
//! insert-once per coordinate, readiness flags only ever move forward.

pub mod db;

pub use db::{
    DeviceRepository, DeviceRow, DiamondImageRow, DiamondRepository, DiamondRow, JobRepository,
    JobRow, NewDiamondImage, OrgRepository, OrgRow, RingRepository, RingRow,
};

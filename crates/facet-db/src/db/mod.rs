//! Database repositories for data access layer
//!
//! Each repository is responsible for one entity of the ingestion ledger
//! (orgs, devices, jobs, rings, diamonds) and owns its queries.

pub mod device;
pub mod diamond;
pub mod job;
pub mod org;
pub mod ring;
pub mod rows;

pub use device::DeviceRepository;
pub use diamond::{DiamondRepository, NewDiamondImage};
pub use job::JobRepository;
pub use org::OrgRepository;
pub use ring::RingRepository;
pub use rows::{DeviceRow, DiamondImageRow, DiamondRow, JobRow, OrgRow, RingRow};

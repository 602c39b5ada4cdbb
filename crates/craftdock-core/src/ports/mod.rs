//! Port traits the engine consumes from the outside world.
//!
//! Ports express intent, not implementation detail: implementations live
//! in adapter crates (`craftdock-registry`) or in test fakes.

mod registry;

pub use registry::{
    PackageSummary, PackageVersion, RegistryPort, RegistryPortError, RegistryResult,
};

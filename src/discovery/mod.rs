//! Device discovery.

pub mod poller;

pub use poller::{DevicePoller, ScanOptions, SearchState};

//! PulseWatch Backend Library
//!
//! Exposes the monitoring engine and its collaborators for use by the binary
//! and the integration tests.

pub mod api;
pub mod monitoring;
pub mod notify;
pub mod storage;

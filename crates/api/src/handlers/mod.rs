//! Request handlers, grouped by resource.

pub mod auth;
pub mod catalog;
pub mod device_jobs;
pub mod devices;
pub mod jobs;
pub mod recipes;
pub mod reservoirs;

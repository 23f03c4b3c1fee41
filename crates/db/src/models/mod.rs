//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for the write paths, validated with `validator`
//!   where the payload carries user-entered data

pub mod device;
pub mod job;
pub mod recipe;
pub mod reservoir;
pub mod status;
pub mod user;

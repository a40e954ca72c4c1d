//! Command implementations

pub mod build;
pub(crate) mod common;
pub mod db;
pub mod diff;
pub mod update;

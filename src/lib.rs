// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod batch;
pub mod config;
pub mod db;
pub mod draft;
pub mod importer;
pub mod resolve;
pub mod roster;
pub mod sheet;

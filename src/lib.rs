pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod job;
pub mod mock;
pub mod model;
pub mod plan;
pub mod plane;
pub mod prompt;
pub mod report;
pub mod soql;

pub use error::{OrgBridgeError, Result};

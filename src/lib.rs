pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod model;
pub mod ops;
pub mod order;
pub mod output;
pub mod paths;
pub mod query;
pub mod stats;
pub mod validate;

pub use error::{Error, Result};

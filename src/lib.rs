// src/lib.rs

//! Log bundle intake: split diagnostic dumps into sections and keep them under a random key
//! for two days.

pub mod cli;
pub mod commands;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod observer;
pub mod splitter;

pub use db::BundleStore;
pub use error::{DropError, Result};
pub use models::{LogBundle, Payload, Sections};

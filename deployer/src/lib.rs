//! IPAM Deployer Library
//!
//! Provisions the IPAM infrastructure from a compiled template, moves the
//! engine secret into Key Vault and publishes the engine archive.

pub mod app;
pub mod azure;
pub mod config;
pub mod console;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod github;
pub mod logs;
pub mod utils;

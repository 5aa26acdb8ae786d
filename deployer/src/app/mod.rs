//! Top-level deployment flow

pub mod options;
pub mod run;
pub mod services;

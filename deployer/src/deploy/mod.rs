//! Deployment components

pub mod fetcher;
pub mod fsm;
pub mod invoker;
pub mod publisher;
pub mod secrets;

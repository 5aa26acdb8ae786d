//! Wire models shared by the IPAM deployer clients.

pub mod models;

//! Azure Resource Manager, Key Vault and Kudu clients

pub mod client;
pub mod credential;
pub mod deployments;
pub mod keyvault;
pub mod webapps;

pub use client::ArmClient;
pub use credential::{AzureCliCredential, TokenProvider};

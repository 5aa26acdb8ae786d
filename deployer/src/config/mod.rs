//! Configuration document and resolution into an effective parameter set

pub mod cloud;
pub mod document;
pub mod resolver;

pub use cloud::CloudEnvironment;
pub use document::{DeployConfig, PackagingMode};
pub use resolver::{resolve, EffectiveConfig, EngineIdentity, Overrides};

//! Run options

use std::path::PathBuf;

use crate::deploy::fsm::FsmSettings;

/// Knobs for one run that do not come from the configuration document
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Retry settings applied to each publish transport
    pub publish: FsmSettings,

    /// Parent of the temporary directory a downloaded archive lands in
    pub temp_root: PathBuf,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            publish: FsmSettings::default(),
            temp_root: std::env::temp_dir(),
        }
    }
}

//! Finite State Machine for a single publish transport

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// FSM settings
#[derive(Debug, Clone)]
pub struct FsmSettings {
    /// Retries after the initial attempt
    pub retry_count: u32,

    /// Fixed delay between attempts
    pub retry_delay: Duration,
}

impl Default for FsmSettings {
    fn default() -> Self {
        Self {
            retry_count: 3,
            retry_delay: Duration::from_secs(30),
        }
    }
}

/// Publish state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishState {
    /// Nothing attempted yet
    Idle,

    /// Upload in flight
    Attempting,

    /// Last attempt failed, waiting to try again
    Retrying,

    /// Upload accepted
    Success,

    /// Retry budget spent
    Exhausted,
}

/// Publish event
#[derive(Debug, Clone)]
pub enum PublishEvent {
    /// Start an upload
    Attempt,

    /// Upload succeeded
    Succeeded,

    /// Upload failed
    Failed(String),
}

/// Publish FSM
#[derive(Debug, Clone)]
pub struct PublishFsm {
    state: PublishState,
    error: Option<String>,
    attempts: u32,
    max_retries: u32,
}

impl PublishFsm {
    /// Create a new FSM in idle state
    pub fn new(max_retries: u32) -> Self {
        Self {
            state: PublishState::Idle,
            error: None,
            attempts: 0,
            max_retries,
        }
    }

    /// Get current state
    pub fn state(&self) -> &PublishState {
        &self.state
    }

    /// Last error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Attempts started so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, PublishState::Success | PublishState::Exhausted)
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: PublishEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (PublishState::Idle, PublishEvent::Attempt)
            | (PublishState::Retrying, PublishEvent::Attempt) => {
                self.attempts += 1;
                PublishState::Attempting
            }

            (PublishState::Attempting, PublishEvent::Succeeded) => {
                self.error = None;
                PublishState::Success
            }
            (PublishState::Attempting, PublishEvent::Failed(err)) => {
                self.error = Some(err.clone());
                // attempts includes the initial one
                if self.attempts > self.max_retries {
                    PublishState::Exhausted
                } else {
                    PublishState::Retrying
                }
            }

            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

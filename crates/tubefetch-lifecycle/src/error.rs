//! Lifecycle error types.

use std::fmt;

use thiserror::Error;
use tubefetch_models::DownloadStatus;

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Operation attempted on the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Start,
    Advance,
    Reset,
    SelectOption,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleAction::Start => "start a download",
            LifecycleAction::Advance => "advance",
            LifecycleAction::Reset => "reset",
            LifecycleAction::SelectOption => "change the download option",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Cannot {action} while download is {from}")]
    InvalidTransition {
        from: DownloadStatus,
        action: LifecycleAction,
    },

    #[error("Download option {index} does not exist ({available} available)")]
    OptionOutOfRange { index: usize, available: usize },
}

impl LifecycleError {
    pub fn invalid(from: DownloadStatus, action: LifecycleAction) -> Self {
        Self::InvalidTransition { from, action }
    }
}

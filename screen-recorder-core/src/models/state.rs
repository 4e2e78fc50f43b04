use super::error::RecorderError;

/// Recording session state machine.
///
/// State transitions:
/// ```text
/// idle → starting → recording → stopping → stopped
///           ↓           ↓
///         failed ←──────┘
/// ```
/// `stopped` and `failed` return to `idle` only once the caller
/// acknowledges them.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Starting,
    Recording,
    Stopping,
    Stopped,
    Failed(RecorderError),
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed(_))
    }

    /// Whether the session may move from `self` to `next`.
    pub fn can_transition_to(&self, next: &SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Starting)
                | (Starting, Recording)
                | (Starting, Failed(_))
                | (Recording, Stopping)
                | (Recording, Failed(_))
                | (Stopping, Stopped)
                | (Stopped, Idle)
                | (Failed(_), Idle)
        )
    }

    /// Short lowercase label, handy for status displays and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Recording => "recording",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed(_) => "failed",
        }
    }
}

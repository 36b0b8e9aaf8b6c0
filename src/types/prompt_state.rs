use chrono::{DateTime, Utc};

/// Persisted record of whether this client has already been sent to the
/// upgrade page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptState {
    pub prompted: bool,
    /// `None` with `prompted == true` means the prompt never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl PromptState {
    pub fn fresh() -> Self {
        Self::default()
    }

    pub fn prompted_until(expires_at: DateTime<Utc>) -> Self {
        Self {
            prompted: true,
            expires_at: Some(expires_at),
        }
    }
}

use super::error::Result;
use super::storage::{KeyValueStore, PROMPTED_KEY, PROMPT_EXPIRES_KEY, REDIRECT_KEY};
use super::types::PromptState;
use chrono::{DateTime, Duration, SecondsFormat, Utc};

pub const DEFAULT_COOLDOWN_DAYS: i64 = 30;

/// Whether the unsupported-client flow should fire for `state` at `now`.
///
/// A prompted state without an expiry never fires again.
pub fn should_act(state: &PromptState, now: DateTime<Utc>) -> bool {
    !state.prompted || state.expires_at.map_or(false, |at| at < now)
}

/// Reads and writes [`PromptState`] through a [`KeyValueStore`].
pub struct PromptThrottle<'s, S: KeyValueStore + ?Sized> {
    store: &'s mut S,
    cooldown: Duration,
}

impl<'s, S: KeyValueStore + ?Sized> PromptThrottle<'s, S> {
    pub fn new(store: &'s mut S) -> Self {
        Self::with_cooldown(store, Duration::days(DEFAULT_COOLDOWN_DAYS))
    }

    pub fn with_cooldown(store: &'s mut S, cooldown: Duration) -> Self {
        Self { store, cooldown }
    }

    /// The persisted state. Values that do not parse read as absent.
    pub fn load(&self) -> Result<PromptState> {
        let prompted = self.store.get(PROMPTED_KEY)?.as_deref() == Some("true");
        let expires_at = self
            .store
            .get(PROMPT_EXPIRES_KEY)?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|at| at.with_timezone(&Utc));
        Ok(PromptState {
            prompted,
            expires_at,
        })
    }

    pub fn should_act(&self, now: DateTime<Utc>) -> Result<bool> {
        Ok(should_act(&self.load()?, now))
    }

    /// Mark the client as prompted until `now + cooldown`.
    pub fn record_prompt(&mut self, now: DateTime<Utc>) -> Result<PromptState> {
        let state = PromptState::prompted_until(now + self.cooldown);
        self.store.set(PROMPTED_KEY, "true")?;
        if let Some(at) = state.expires_at {
            self.store.set(
                PROMPT_EXPIRES_KEY,
                &at.to_rfc3339_opts(SecondsFormat::Millis, true),
            )?;
        }
        Ok(state)
    }

    /// Clear the prompt and return the page to send the user back to.
    pub fn reset(&mut self) -> Result<String> {
        self.store.remove(PROMPTED_KEY)?;
        self.store.remove(PROMPT_EXPIRES_KEY)?;
        Ok(self
            .store
            .get(REDIRECT_KEY)?
            .unwrap_or_else(|| "/".to_string()))
    }
}

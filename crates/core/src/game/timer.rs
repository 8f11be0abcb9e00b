use std::time::Duration;

use super::Effect;

/// Identifies one scheduled delay of one machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

impl TimerToken {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// A delay the caller must wait out before calling `fire(token)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub token: TimerToken,
    pub delay: Duration,
}

/// Pending deferred actions keyed by token.
///
/// Tokens are never reused, so a stale `fire` after `cancel` or after the
/// action ran finds nothing.
#[derive(Debug, Clone)]
pub(crate) struct Deferrals<A> {
    next: u64,
    pending: Vec<(TimerToken, A)>,
}

impl<A: PartialEq> Deferrals<A> {
    pub(crate) fn new() -> Self {
        Self {
            next: 0,
            pending: Vec::new(),
        }
    }

    pub(crate) fn schedule(&mut self, action: A, delay: Duration) -> Effect {
        let token = TimerToken(self.next);
        self.next += 1;
        self.pending.push((token, action));
        Effect::Schedule(Timer { token, delay })
    }

    pub(crate) fn take(&mut self, token: TimerToken) -> Option<A> {
        let idx = self.pending.iter().position(|(t, _)| *t == token)?;
        Some(self.pending.remove(idx).1)
    }

    /// Drops every pending instance of `action`.
    pub(crate) fn cancel(&mut self, action: &A) {
        self.pending.retain(|(_, a)| a != action);
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

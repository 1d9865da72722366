//! Bounded convergence polling after a transition command is accepted.

use std::time::Duration;

use crate::provider::{CloudProvider, Instance, ProviderError};
use crate::transition::Transition;

/// How many times to re-query before giving up.
pub const MAX_ATTEMPTS: usize = 60;

/// Pause between consecutive queries.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    pub max_attempts: usize,
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            interval: POLL_INTERVAL,
        }
    }
}

/// Result of a poll run. Timing out is a distinct outcome, not an
/// error: the caller gets the last observation either way and decides
/// what a stale state means for it.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Converged(Instance),
    TimedOut(Instance),
}

impl PollOutcome {
    pub fn instance(&self) -> &Instance {
        match self {
            Self::Converged(instance) | Self::TimedOut(instance) => instance,
        }
    }

    pub fn converged(&self) -> bool {
        matches!(self, Self::Converged(_))
    }
}

/// Re-query the instance until it reaches the transition target.
///
/// Queries immediately, then sleeps `opts.interval` between attempts,
/// so convergence on the Nth observation costs N-1 sleeps. Every
/// observation is fresh; nothing is cached. A describe failure aborts
/// the poll (we no longer know the instance state, so pressing on would
/// just mask the problem).
///
/// `sleep` is injected so tests can count pauses instead of waiting.
pub fn wait_for_state(
    provider: &dyn CloudProvider,
    id: &str,
    transition: &Transition,
    opts: &PollOptions,
    sleep: &mut dyn FnMut(Duration),
) -> Result<PollOutcome, ProviderError> {
    let mut last = provider.describe(id)?;
    if last.state == transition.to {
        return Ok(PollOutcome::Converged(last));
    }

    for _ in 1..opts.max_attempts {
        sleep(opts.interval);
        last = provider.describe(id)?;
        if last.state == transition.to {
            return Ok(PollOutcome::Converged(last));
        }
    }

    Ok(PollOutcome::TimedOut(last))
}

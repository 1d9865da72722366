//! Transition planning: which way to flip the instance, if at all.

use crate::provider::{CloudProvider, InstanceState, ProviderError};

/// A planned state flip. Only Running↔Stopped pairs are ever built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: InstanceState,
    pub to: InstanceState,
}

/// Derive the target state from the current one.
///
/// `None` means the instance is mid-transition (pending, stopping, ...)
/// or gone (terminated) and the process should end without acting. This
/// is the single decision point; no provider command is issued unless
/// this returns `Some`.
pub fn plan(state: &InstanceState) -> Option<Transition> {
    match state {
        InstanceState::Running => Some(Transition {
            from: InstanceState::Running,
            to: InstanceState::Stopped,
        }),
        InstanceState::Stopped => Some(Transition {
            from: InstanceState::Stopped,
            to: InstanceState::Running,
        }),
        InstanceState::Other(_) => None,
    }
}

/// Issue the start or stop command matching the planned transition.
///
/// Returns the provider-accepted transitional state for confirmation
/// output. A command failure means no polling target is valid, so the
/// error propagates and the flow stops here.
pub fn apply(
    provider: &dyn CloudProvider,
    id: &str,
    transition: &Transition,
) -> Result<InstanceState, ProviderError> {
    match transition.to {
        InstanceState::Running => provider.start(id),
        InstanceState::Stopped => provider.stop(id),
        // plan() never emits this
        InstanceState::Other(_) => Err(ProviderError::Malformed(
            "transition to a non-stable state".to_string(),
        )),
    }
}

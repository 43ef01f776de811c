// SPDX-License-Identifier: GPL-3.0-only

//! Permission gate
//!
//! Holds gated actions back until their permission is granted. The gate keeps
//! no copy of the permission state itself: it asks the broker every time and
//! only remembers which prompts are open and what is waiting on them.

use crate::app::state::{Effect, GatedAction};
use crate::backends::permissions::{Permission, PermissionBroker};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Answer of [`PermissionGate::ensure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Proceed now
    Granted,
    /// A prompt is open; the action runs when it is answered
    RequestInFlight,
}

/// Answer of [`PermissionGate::resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Granted; run these parked actions in order
    Granted(Vec<GatedAction>),
    /// Denied; the parked actions were dropped
    Denied,
    /// No prompt for this permission was open
    Unexpected,
}

pub struct PermissionGate {
    broker: Arc<dyn PermissionBroker>,
    in_flight: HashSet<Permission>,
    parked: Vec<GatedAction>,
}

impl PermissionGate {
    pub fn new(broker: Arc<dyn PermissionBroker>) -> Self {
        Self {
            broker,
            in_flight: HashSet::new(),
            parked: Vec::new(),
        }
    }

    /// Check the permission `action` needs, prompting if necessary
    ///
    /// At most one prompt per permission is open at a time; a repeated
    /// request while one is open only parks the action.
    pub fn ensure(&mut self, action: GatedAction, effects: &mut Vec<Effect>) -> GateDecision {
        let permission = action.permission();
        if self.broker.is_granted(permission) {
            return GateDecision::Granted;
        }

        if !self.parked.contains(&action) {
            self.parked.push(action);
        }

        if self.in_flight.insert(permission) {
            info!(%permission, ?action, "Requesting permission");
            effects.push(Effect::RequestPermission(permission));
        } else {
            debug!(%permission, ?action, "Permission prompt already open");
        }
        GateDecision::RequestInFlight
    }

    /// Close the prompt for `permission` with the user's answer
    pub fn resolve(&mut self, permission: Permission, granted: bool) -> Resolution {
        if !self.in_flight.remove(&permission) {
            warn!(%permission, granted, "Permission answer without an open prompt");
            return Resolution::Unexpected;
        }

        let (released, kept): (Vec<_>, Vec<_>) = self
            .parked
            .drain(..)
            .partition(|action| action.permission() == permission);
        self.parked = kept;

        if granted {
            info!(%permission, resumed = released.len(), "Permission granted");
            Resolution::Granted(released)
        } else {
            info!(%permission, dropped = released.len(), "Permission denied");
            Resolution::Denied
        }
    }

    /// Forget a parked action, e.g. camera start after the user left the screen
    pub fn cancel(&mut self, action: GatedAction) {
        self.parked.retain(|parked| *parked != action);
    }

    /// Current answer from the broker, without prompting
    pub fn is_granted(&self, permission: Permission) -> bool {
        self.broker.is_granted(permission)
    }

    pub fn is_pending(&self, permission: Permission) -> bool {
        self.in_flight.contains(&permission)
    }
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate")
            .field("in_flight", &self.in_flight)
            .field("parked", &self.parked)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::{BoxFuture, FutureExt};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FixedBroker {
        granted: Mutex<HashSet<Permission>>,
    }

    impl PermissionBroker for FixedBroker {
        fn is_granted(&self, permission: Permission) -> bool {
            self.granted.lock().unwrap().contains(&permission)
        }

        fn request(&self, _permission: Permission) -> BoxFuture<'static, bool> {
            async { false }.boxed()
        }
    }

    fn gate(granted: &[Permission]) -> PermissionGate {
        let broker = FixedBroker::default();
        broker.granted.lock().unwrap().extend(granted.iter().copied());
        PermissionGate::new(Arc::new(broker))
    }

    #[test]
    fn test_granted_proceeds_without_prompt() {
        let mut gate = gate(&[Permission::Camera]);
        let mut effects = Vec::new();

        let decision = gate.ensure(GatedAction::StartCamera, &mut effects);

        assert_eq!(decision, GateDecision::Granted);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_single_prompt_per_permission() {
        let mut gate = gate(&[]);
        let mut effects = Vec::new();

        gate.ensure(GatedAction::StartCamera, &mut effects);
        gate.ensure(GatedAction::StartCamera, &mut effects);
        gate.ensure(GatedAction::OpenPicker, &mut effects);

        assert_eq!(
            effects,
            vec![
                Effect::RequestPermission(Permission::Camera),
                Effect::RequestPermission(Permission::StorageRead),
            ]
        );
        assert!(gate.is_pending(Permission::Camera));
    }

    #[test]
    fn test_grant_releases_only_matching_actions() {
        let mut gate = gate(&[]);
        let mut effects = Vec::new();
        gate.ensure(GatedAction::StartCamera, &mut effects);
        gate.ensure(GatedAction::OpenPicker, &mut effects);

        assert_eq!(
            gate.resolve(Permission::StorageRead, true),
            Resolution::Granted(vec![GatedAction::OpenPicker])
        );
        assert_eq!(
            gate.resolve(Permission::Camera, false),
            Resolution::Denied
        );
        assert_eq!(
            gate.resolve(Permission::Camera, true),
            Resolution::Unexpected
        );
    }

    #[test]
    fn test_denied_action_can_be_requested_again() {
        let mut gate = gate(&[]);
        let mut effects = Vec::new();
        gate.ensure(GatedAction::StartCamera, &mut effects);
        gate.resolve(Permission::Camera, false);

        gate.ensure(GatedAction::StartCamera, &mut effects);

        assert_eq!(effects.len(), 2);
    }

    #[test]
    fn test_cancelled_action_is_not_resumed() {
        let mut gate = gate(&[]);
        let mut effects = Vec::new();
        gate.ensure(GatedAction::StartCamera, &mut effects);
        gate.cancel(GatedAction::StartCamera);

        assert_eq!(
            gate.resolve(Permission::Camera, true),
            Resolution::Granted(Vec::new())
        );
    }
}

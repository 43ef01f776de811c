// SPDX-License-Identifier: GPL-3.0-only

//! Permission handlers

use crate::app::ScannerModel;
use crate::app::permission_gate::{GateDecision, Resolution};
use crate::app::state::{Effect, GatedAction, Notice};
use crate::backends::permissions::Permission;
use tracing::debug;

impl ScannerModel {
    pub(crate) fn handle_permission_result(
        &mut self,
        permission: Permission,
        granted: bool,
    ) -> Vec<Effect> {
        match self.gate.resolve(permission, granted) {
            Resolution::Granted(actions) => actions
                .into_iter()
                .flat_map(|action| self.run_gated(action))
                .collect(),
            Resolution::Denied => {
                self.notify(Notice::denied(permission));
                Vec::new()
            }
            Resolution::Unexpected => Vec::new(),
        }
    }

    /// Run `action` now if its permission is granted, otherwise prompt
    pub(crate) fn gated(&mut self, action: GatedAction) -> Vec<Effect> {
        let mut effects = Vec::new();
        match self.gate.ensure(action, &mut effects) {
            GateDecision::Granted => effects.extend(self.run_gated(action)),
            GateDecision::RequestInFlight => {}
        }
        effects
    }

    fn run_gated(&mut self, action: GatedAction) -> Vec<Effect> {
        match action {
            GatedAction::StartCamera => {
                if self.panel.is_visible() || self.still.active {
                    debug!("Camera start skipped, screen is busy");
                    return Vec::new();
                }
                self.start_camera()
            }
            GatedAction::OpenPicker => vec![Effect::OpenImagePicker],
        }
    }
}

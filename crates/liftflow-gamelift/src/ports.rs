//! Inbound port permission diffing
//!
//! GameLift exposes port settings as two lists on `UpdateFleetPortSettings`:
//! permissions to authorize and permissions to revoke. The service applies
//! revocations before authorizations, so applying the delta to the recorded
//! rules always lands on the desired rules.

use crate::model::IpPermission;
use liftflow_cloud::{SetDiff, diff_sets};

/// Changes to send with `UpdateFleetPortSettings`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSettingsDelta {
    /// Desired rules not yet open
    pub authorizations: Vec<IpPermission>,
    /// Open rules no longer desired
    pub revocations: Vec<IpPermission>,
}

impl PortSettingsDelta {
    pub fn is_empty(&self) -> bool {
        self.authorizations.is_empty() && self.revocations.is_empty()
    }

}

/// Revocations are removals and authorizations are additions, so
/// [`SetDiff::apply_to`] gives the rules in effect after the update.
impl From<&PortSettingsDelta> for SetDiff<IpPermission> {
    fn from(delta: &PortSettingsDelta) -> Self {
        SetDiff {
            added: delta.authorizations.clone(),
            removed: delta.revocations.clone(),
        }
    }
}

/// Compute the port settings delta from `old` (open now) to `new` (desired).
///
/// Every field of a rule takes part in the comparison, so changing only the
/// protocol or CIDR of a range revokes the old rule and authorizes the new
/// one. Duplicate rules collapse and the order of either input is irrelevant.
pub fn diff_port_settings(old: &[IpPermission], new: &[IpPermission]) -> PortSettingsDelta {
    let diff = diff_sets(old, new);
    PortSettingsDelta {
        authorizations: diff.added,
        revocations: diff.removed,
    }
}

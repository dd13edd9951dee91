use tollgate_auth::{ClaimsSnapshot, PrincipalId};
use tollgate_entitlement::Decision;

use crate::gate::Admission;

/// Entitlement context for an admitted request.
///
/// Inserted into request extensions by the gate middleware, so handlers can
/// enforce again closer to the resource when the gate failed open.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitlementContext {
    principal_id: Option<PrincipalId>,
    decision: Decision,
    degraded: bool,
    snapshot: Option<ClaimsSnapshot>,
}

impl EntitlementContext {
    pub fn new(admission: Admission) -> Self {
        Self {
            degraded: admission.is_degraded(),
            principal_id: admission.principal_id,
            decision: admission.decision,
            snapshot: admission.snapshot,
        }
    }

    /// `None` on public routes.
    pub fn principal_id(&self) -> Option<&PrincipalId> {
        self.principal_id.as_ref()
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn snapshot(&self) -> Option<&ClaimsSnapshot> {
        self.snapshot.as_ref()
    }
}

use flowplan_core::OrganizationId;

use crate::EventEnvelope;

/// Helper trait for organization-scoped messages.
///
/// Consumers sharing one bus across organizations use it to drop messages that
/// belong to another organization.
pub trait OrganizationScoped {
    fn organization_id(&self) -> OrganizationId;

    fn belongs_to(&self, organization_id: OrganizationId) -> bool {
        self.organization_id() == organization_id
    }
}

impl<E> OrganizationScoped for EventEnvelope<E> {
    fn organization_id(&self) -> OrganizationId {
        EventEnvelope::organization_id(self)
    }
}

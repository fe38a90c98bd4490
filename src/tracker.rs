//! Bookkeeping for the declared fields a scope must write before it closes.
use crate::schema::ContainerSchema;
use std::collections::BTreeSet;

/// The set of declared field names not yet written in the current scope.
///
/// Seeded lazily from the container schema on the first write; a scope that never
/// writes anything is never seeded and closes without enforcement, matching the
/// behavior of a freshly constructed writer that is opened and immediately closed.
#[derive(Default)]
pub(crate) struct RequiredFieldTracker {
    fields: Option<BTreeSet<&'static str>>,
}

impl RequiredFieldTracker {
    /// Seeds the working set from the schema's declared fields. No-op once seeded.
    /// An absent schema seeds an empty set, disabling enforcement.
    pub fn ensure_seeded(&mut self, schema: Option<&'static ContainerSchema>) {
        if self.fields.is_none() {
            self.fields = Some(
                schema
                    .map(|s| s.field_names().collect())
                    .unwrap_or_default(),
            );
        }
    }

    /// Removes a field from the working set.
    ///
    /// Names outside the declared set are tolerated silently, so repeated writes and
    /// synthetic fields do not fault.
    pub fn mark_satisfied(&mut self, name: &str) {
        if let Some(fields) = &mut self.fields {
            fields.remove(name);
        }
    }

    /// The declared fields still unwritten, in name order. Empty when unseeded.
    pub fn unmet(&self) -> Vec<&'static str> {
        self.fields
            .as_ref()
            .map(|fields| fields.iter().copied().collect())
            .unwrap_or_default()
    }
}

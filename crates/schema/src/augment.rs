use crate::types::TypeDescriptor;

/// Host-side customization of generated types, e.g. attaching authorization directives.
///
/// Called exactly once for every descriptor of a registry, including the per-service query and
/// mutation roots, before the registry is published.
pub trait AugmentTypes: Send + Sync {
    fn augment(&self, descriptor: &mut TypeDescriptor);
}

impl<F> AugmentTypes for F
where
    F: Fn(&mut TypeDescriptor) + Send + Sync,
{
    fn augment(&self, descriptor: &mut TypeDescriptor) {
        self(descriptor);
    }
}

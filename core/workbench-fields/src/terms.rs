/// Resolves human-readable taxonomy values to term ids.
///
/// Implementations may create missing terms. Returning `None` means the
/// value could not be resolved and the reconciler drops it with a warning.
pub trait TermResolver {
    fn resolve_or_create_term(&self, vocabularies: &[String], raw: &str) -> Option<u64>;
}

/// Resolver for offline use: only numeric term ids resolve.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTermLookup;

impl TermResolver for NoTermLookup {
    fn resolve_or_create_term(&self, _vocabularies: &[String], raw: &str) -> Option<u64> {
        raw.trim().parse().ok()
    }
}

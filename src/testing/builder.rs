use std::marker::PhantomData;

use super::ActionFilter;

/// Marks a [`FilterBuilder`] that ends in a verifier.
#[derive(Debug, Clone, Copy)]
pub struct ForVerifier;

/// Marks a [`FilterBuilder`] that ends in an assertion.
#[derive(Debug, Clone, Copy)]
pub struct ForAssertion;

/// Marks a [`FilterBuilder`] that ends in a reactor.
#[derive(Debug, Clone, Copy)]
pub struct ForReactor;

/// Fluent builder for an [`ActionFilter`].
///
/// The marker type decides which terminal methods are available:
/// [`verify`] ends in `is_seen()` / `passes(..)`, [`assertion`] in
/// `is_seen()`, `seen_count_is(..)` and friends, [`react_to`] in `with(..)`.
#[derive(Debug, Clone)]
pub struct FilterBuilder<K> {
    pub(crate) filter: ActionFilter,
    _kind: PhantomData<K>,
}

impl<K> FilterBuilder<K> {
    fn new(verb: &str) -> Self {
        Self {
            filter: ActionFilter::new(verb),
            _kind: PhantomData,
        }
    }

    /// See [`ActionFilter::on`].
    pub fn on(mut self, resource: &str) -> Self {
        self.filter = self.filter.on(resource);
        self
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.filter = self.filter.in_namespace(namespace);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.filter = self.filter.named(name);
        self
    }

    pub fn filter(&self) -> &ActionFilter {
        &self.filter
    }
}

impl<K> From<FilterBuilder<K>> for ActionFilter {
    fn from(builder: FilterBuilder<K>) -> Self {
        builder.filter
    }
}

/// Start a verifier for actions with `verb` (`*` for any).
///
/// ```rust
/// use ctrlcheck::testing::verify;
///
/// let verifier = verify("update").on("widgets/status").named("w1").is_seen();
/// ```
pub fn verify(verb: &str) -> FilterBuilder<ForVerifier> {
    FilterBuilder::new(verb)
}

/// Start an assertion over actions with `verb` (`*` for any).
pub fn assertion(verb: &str) -> FilterBuilder<ForAssertion> {
    FilterBuilder::new(verb)
}

/// Start a reactor intercepting actions with `verb` (`*` for any).
pub fn react_to(verb: &str) -> FilterBuilder<ForReactor> {
    FilterBuilder::new(verb)
}

//! Comparator strategy
//!
//! Decides whether a candidate value is equivalent to the control value.
//! Same-typed experiments default to `==`; cross-typed experiments must
//! supply their own predicate since no default can be inferred.

use std::fmt;
use std::sync::Arc;

type Predicate<T, U> = dyn Fn(&T, &U) -> bool + Send + Sync;

/// Shared equivalence predicate over a control value and a candidate value.
///
/// Cloning is cheap; clones share the same predicate.
///
/// # Example
///
/// ```rust
/// use scientist::Comparator;
///
/// // Control returns cents as integer, candidate returns a decimal string.
/// let cents_match = Comparator::new(|control: &i64, candidate: &String| {
///     candidate.replace('.', "").parse::<i64>().ok() == Some(*control)
/// });
/// assert!(cents_match.matches(&1999, &"19.99".to_string()));
/// ```
pub struct Comparator<T, U = T> {
    predicate: Arc<Predicate<T, U>>,
}

impl<T, U> Comparator<T, U> {
    /// Wrap a predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&T, &U) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Compare by projecting both sides onto a common key.
    pub fn by_key<K, FT, FU>(control_key: FT, candidate_key: FU) -> Self
    where
        T: 'static,
        U: 'static,
        K: PartialEq + 'static,
        FT: Fn(&T) -> K + Send + Sync + 'static,
        FU: Fn(&U) -> K + Send + Sync + 'static,
    {
        Self::new(move |control, candidate| control_key(control) == candidate_key(candidate))
    }

    /// Whether `candidate` is equivalent to `control`.
    #[must_use]
    pub fn matches(&self, control: &T, candidate: &U) -> bool {
        (self.predicate)(control, candidate)
    }
}

impl<T: PartialEq + 'static> Comparator<T, T> {
    /// Structural equality via `PartialEq`.
    #[must_use]
    pub fn equality() -> Self {
        Self::new(|control: &T, candidate: &T| control == candidate)
    }
}

impl<T: PartialEq + 'static> Default for Comparator<T, T> {
    fn default() -> Self {
        Self::equality()
    }
}

impl<T, U> Clone for Comparator<T, U> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<T, U> fmt::Debug for Comparator<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comparator").finish_non_exhaustive()
    }
}

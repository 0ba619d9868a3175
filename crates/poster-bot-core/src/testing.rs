//! Testing helpers and mock utilities.
//!
//! Provides convenient constructors for mocked poster resolvers.

use crate::poster::MockPosterResolver;

/// Create a mock resolver that finds `url` for every app name.
#[must_use]
pub fn mock_resolver_found(url: &'static str) -> MockPosterResolver {
    let mut mock = MockPosterResolver::new();
    mock.expect_resolve()
        .returning(move |_| Some(url.to_string()));
    mock
}

/// Create a mock resolver that never finds anything.
#[must_use]
pub fn mock_resolver_not_found() -> MockPosterResolver {
    let mut mock = MockPosterResolver::new();
    mock.expect_resolve().returning(|_| None);
    mock
}

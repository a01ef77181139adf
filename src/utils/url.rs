//! URL utilities for consistent endpoint handling
//!
//! This module provides utilities for normalizing the analysis endpoint so
//! that values from flags, the environment, and the config file all end up
//! in the same shape.

/// Normalize an endpoint URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use loglens::utils::url::normalize_endpoint;
///
/// assert_eq!(normalize_endpoint("http://127.0.0.1:5001/analyze"), "http://127.0.0.1:5001/analyze");
/// assert_eq!(normalize_endpoint("http://127.0.0.1:5001/analyze/"), "http://127.0.0.1:5001/analyze");
/// ```
pub fn normalize_endpoint(endpoint: &str) -> String {
    endpoint.trim_end_matches('/').to_string()
}

/// Prepend `http://` when the endpoint has no scheme, so bare host:port
/// values work from the command line.
///
/// # Examples
///
/// ```
/// use loglens::utils::url::with_default_scheme;
///
/// assert_eq!(with_default_scheme("127.0.0.1:5001/analyze"), "http://127.0.0.1:5001/analyze");
/// assert_eq!(with_default_scheme("https://analysis.internal/analyze"), "https://analysis.internal/analyze");
/// ```
pub fn with_default_scheme(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint() {
        // No trailing slash - should remain unchanged
        assert_eq!(
            normalize_endpoint("http://127.0.0.1:5001/analyze"),
            "http://127.0.0.1:5001/analyze"
        );

        // Single trailing slash - should be removed
        assert_eq!(
            normalize_endpoint("http://127.0.0.1:5001/analyze/"),
            "http://127.0.0.1:5001/analyze"
        );

        // Multiple trailing slashes - should all be removed
        assert_eq!(
            normalize_endpoint("http://127.0.0.1:5001/analyze///"),
            "http://127.0.0.1:5001/analyze"
        );

        // Empty string
        assert_eq!(normalize_endpoint(""), "");
    }

    #[test]
    fn test_with_default_scheme() {
        assert_eq!(
            with_default_scheme("127.0.0.1:5001/analyze"),
            "http://127.0.0.1:5001/analyze"
        );

        assert_eq!(
            with_default_scheme("http://127.0.0.1:5001/analyze"),
            "http://127.0.0.1:5001/analyze"
        );

        assert_eq!(
            with_default_scheme("https://analysis.internal/analyze"),
            "https://analysis.internal/analyze"
        );
    }
}

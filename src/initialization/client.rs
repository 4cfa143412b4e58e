//! HTTP client initialization.

use std::sync::Arc;
use std::time::Duration;

use reqwest::ClientBuilder;

/// Maximum redirects followed when reading archived pages.
const MAX_REDIRECTS: usize = 5;

/// Initializes the shared HTTP client used for archive and classifier calls.
///
/// The client-level timeout is a backstop; each call is additionally bounded
/// by its own per-service timeout in the orchestrator.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_client(user_agent: &str, timeout: Duration) -> Result<Arc<reqwest::Client>, reqwest::Error> {
    let client = ClientBuilder::new()
        .timeout(timeout)
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_client() {
        let client = init_client("domain_drop-test", Duration::from_secs(5));
        assert!(client.is_ok());
    }
}

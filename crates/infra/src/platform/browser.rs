use tracing::{info, warn};
use tunestats_common::auth::{AuthError, Navigator};
use url::Url;

/// [`Navigator`] that opens the system browser.
///
/// The URL is logged before the launch so it can be copied by hand on a
/// headless machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserNavigator;

impl BrowserNavigator {
    pub fn new() -> Self {
        Self
    }
}

impl Navigator for BrowserNavigator {
    fn navigate(&self, url: &Url) -> Result<(), AuthError> {
        info!(url = %url, "Opening authorization page in browser");
        open::that(url.as_str()).map_err(|e| {
            warn!(error = %e, "Could not launch a browser; open the logged URL manually");
            AuthError::Navigation(format!("failed to open browser: {e}"))
        })
    }
}

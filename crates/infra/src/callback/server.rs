use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tunestats_domain::{Result, TuneStatsError};
use url::Url;

type CallbackResult = std::result::Result<String, String>;

#[derive(Clone)]
struct CallbackState {
    sender: Arc<Mutex<Option<oneshot::Sender<CallbackResult>>>>,
}

/// Loopback HTTP server that receives the authorization redirect.
///
/// Listens on the redirect URI's host, port and path. The first request
/// carrying `code` or `error` settles [`wait_for_code`](Self::wait_for_code);
/// later requests get the failure page.
pub struct OAuthCallbackServer {
    local_addr: SocketAddr,
    path: String,
    receiver: Mutex<Option<oneshot::Receiver<CallbackResult>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl OAuthCallbackServer {
    /// Start listening for `redirect_uri`.
    ///
    /// # Errors
    /// `TuneStatsError::Config` for a redirect URI without host or port,
    /// `TuneStatsError::Network` if the address cannot be bound.
    pub async fn bind(redirect_uri: &str) -> Result<Self> {
        let url = Url::parse(redirect_uri)
            .map_err(|e| TuneStatsError::Config(format!("invalid redirect URI {redirect_uri}: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| TuneStatsError::Config(format!("redirect URI has no host: {redirect_uri}")))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| TuneStatsError::Config(format!("redirect URI has no port: {redirect_uri}")))?;
        let path = url.path().to_string();

        let listener = TcpListener::bind((host, port)).await.map_err(|err| {
            TuneStatsError::Network(format!("failed to bind OAuth loopback server on {host}:{port}: {err}"))
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|err| TuneStatsError::Network(format!("failed to determine port: {err}")))?;

        let (code_tx, code_rx) = oneshot::channel();
        let state = CallbackState { sender: Arc::new(Mutex::new(Some(code_tx))) };
        let app = Router::new().route(&path, get(handle_oauth_callback)).with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!(error = %err, "OAuth callback server error");
            }
        });

        info!(addr = %local_addr, path = %path, "Waiting for authorization callback");
        Ok(Self {
            local_addr,
            path,
            receiver: Mutex::new(Some(code_rx)),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// URL the provider has to redirect to, with the port actually bound.
    pub fn callback_url(&self) -> String {
        format!("http://{}{}", self.local_addr, self.path)
    }

    /// Await the authorization code.
    ///
    /// # Errors
    /// - `TuneStatsError::Auth` if the provider redirected with `error`
    /// - `TuneStatsError::Network` on timeout
    /// - `TuneStatsError::Internal` if called twice or the server died
    pub async fn wait_for_code(&self, timeout: Duration) -> Result<String> {
        let receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or_else(|| TuneStatsError::Internal("authorization callback already consumed".into()))?;

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(Ok(code))) => Ok(code),
            Ok(Ok(Err(provider_error))) => {
                Err(TuneStatsError::Auth(format!("authorization denied: {provider_error}")))
            }
            Ok(Err(_)) => Err(TuneStatsError::Internal("OAuth callback server stopped".into())),
            Err(_) => Err(TuneStatsError::Network(format!(
                "OAuth callback timeout after {timeout:?} waiting for authorization code"
            ))),
        }
    }

    /// Shut down the loopback server gracefully.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    return Err(TuneStatsError::Internal(format!("OAuth callback server panicked: {err}")));
                }
            }
        }

        Ok(())
    }
}

impl Drop for OAuthCallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}

async fn handle_oauth_callback(
    State(state): State<CallbackState>,
    Query(params): Query<HashMap<String, String>>,
) -> Html<&'static str> {
    let outcome = match (params.get("code"), params.get("error")) {
        (_, Some(error)) => Err(error.clone()),
        (Some(code), None) if !code.is_empty() => Ok(code.clone()),
        _ => {
            debug!("Ignoring callback request without code or error");
            return Html(FAILURE_PAGE);
        }
    };

    let Some(sender) = state.sender.lock().await.take() else {
        warn!("Duplicate authorization callback ignored");
        return Html(FAILURE_PAGE);
    };

    let succeeded = outcome.is_ok();
    if sender.send(outcome).is_err() {
        warn!("Authorization callback arrived after the waiter gave up");
        return Html(FAILURE_PAGE);
    }

    if succeeded {
        Html(SUCCESS_PAGE)
    } else {
        Html(FAILURE_PAGE)
    }
}

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Authorization Complete</title></head>
<body><h1>Authorization Successful</h1><p>You can close this window and return to the terminal.</p></body>
</html>"#;

const FAILURE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Authorization Failed</title></head>
<body><h1>Authorization Failed</h1><p>Invalid or unexpected callback parameters.</p></body>
</html>"#;

//! Short-lived local listener receiving the OAuth redirect.

use std::net::{Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::browser::pages::{error_page, success_page};
use crate::error::AuthError;
use crate::utils::constants::CALLBACK_PATH;

/// Callback query parameters
#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// What the redirect delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Code(String),
    Error { error: String, description: String },
}

struct CallbackState {
    tx: Mutex<Option<oneshot::Sender<CallbackOutcome>>>,
}

impl CallbackState {
    /// false once the flow stopped waiting
    async fn deliver(&self, outcome: CallbackOutcome) -> bool {
        match self.tx.lock().await.take() {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }
}

struct ListenerInner {
    port: u16,
    ipv6: bool,
    shutdown: CancellationToken,
    closed: AtomicBool,
    receiver: Mutex<Option<oneshot::Receiver<CallbackOutcome>>>,
}

/// Local HTTP listener serving only `/callback`.
///
/// Clones share the listener. `close` may be called from the callback path,
/// the timeout path or an outside canceller; only the first call acts.
#[derive(Clone)]
pub struct CallbackListener {
    inner: Arc<ListenerInner>,
}

impl CallbackListener {
    /// Binds 127.0.0.1:`port` (port 0 picks a free one) and, when the host
    /// allows it, [::1] on the same port so `localhost` reaches the listener
    /// whichever family the browser resolves first.
    pub async fn bind(port: u16) -> Result<Self, AuthError> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AuthError::configuration(format!("failed to bind callback listener on {}: {}", addr, e)))?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::configuration(format!("failed to read callback listener address: {}", e)))?
            .port();

        let (tx, rx) = oneshot::channel();
        let state = Arc::new(CallbackState { tx: Mutex::new(Some(tx)) });
        let app = Router::new().route(CALLBACK_PATH, get(handle_callback)).with_state(state);
        let shutdown = CancellationToken::new();

        let v6_addr = SocketAddr::from((Ipv6Addr::LOCALHOST, port));
        let ipv6 = match TcpListener::bind(v6_addr).await {
            Ok(v6) => {
                serve(v6, app.clone(), shutdown.clone());
                true
            }
            Err(e) => {
                debug!(error = %e, port, "callback listener serves IPv4 only");
                false
            }
        };
        serve(listener, app, shutdown.clone());

        info!(port, ipv6, "callback listener started");
        Ok(Self {
            inner: Arc::new(ListenerInner {
                port,
                ipv6,
                shutdown,
                closed: AtomicBool::new(false),
                receiver: Mutex::new(Some(rx)),
            }),
        })
    }

    /// Whether [::1] is bound next to 127.0.0.1.
    pub fn serves_ipv6(&self) -> bool {
        self.inner.ipv6
    }

    pub fn port(&self) -> u16 {
        self.inner.port
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}{}", self.inner.port, CALLBACK_PATH)
    }

    /// Receiver of the callback outcome; handed out once.
    pub(crate) async fn take_receiver(&self) -> Option<oneshot::Receiver<CallbackOutcome>> {
        self.inner.receiver.lock().await.take()
    }

    /// Stops the listener. Returns true only for the call that closed it.
    pub fn close(&self) -> bool {
        if self
            .inner
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.inner.shutdown.cancel();
        debug!(port = self.inner.port, "callback listener closed");
        true
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    debug!(
        has_code = params.code.is_some(),
        error = ?params.error,
        "received authorization callback"
    );

    if let Some(error) = params.error {
        let description = params
            .error_description
            .unwrap_or_else(|| "The authorization server reported an error".to_string());
        let page = error_page(&error, &description);
        if !state.deliver(CallbackOutcome::Error { error, description }).await {
            return not_waiting();
        }
        return (StatusCode::BAD_REQUEST, Html(page)).into_response();
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Html(error_page("missing_code", "Authorization code not provided")),
        )
            .into_response();
    };

    if !state.deliver(CallbackOutcome::Code(code)).await {
        return not_waiting();
    }
    (StatusCode::OK, Html(success_page())).into_response()
}

fn serve(listener: TcpListener, app: Router, stop: CancellationToken) {
    tokio::spawn(async move {
        let addr = listener.local_addr().ok();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move { stop.cancelled().await })
            .await;
        if let Err(e) = served {
            warn!(error = %e, "callback listener stopped with error");
        }
        debug!(addr = ?addr, "callback listener stopped");
    });
}

fn not_waiting() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(error_page("login_not_pending", "This login has already completed or expired")),
    )
        .into_response()
}

use crate::config::Config;
use crate::contact::{ContactMailer, ContactRequest, DispatchError, DispatchOutcome};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared handler state; read-only after startup.
pub struct AppState {
    pub mailer: ContactMailer,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/contact", post(contact))
        .with_state(state)
}

async fn health() -> Json<DispatchOutcome> {
    Json(DispatchOutcome::ok())
}

async fn contact(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ContactRequest>,
) -> (StatusCode, Json<DispatchOutcome>) {
    let host = request_host(&headers);
    match state.mailer.handle(&request, host).await {
        Ok(()) => (StatusCode::OK, Json(DispatchOutcome::ok())),
        Err(e @ DispatchError::Validation) => (StatusCode::BAD_REQUEST, Json(e.outcome())),
        Err(e @ DispatchError::Transport(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(e.outcome()))
        }
    }
}

/// Host the client addressed, without any port suffix. Bracketed IPv6
/// literals (`[::1]:3000`) keep their brackets; only the port after the
/// closing bracket is stripped.
fn request_host(headers: &HeaderMap) -> &str {
    let raw = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let host = match raw.rfind(']') {
        Some(end) => &raw[..=end],
        None => raw.split(':').next().unwrap_or(""),
    };
    if host.is_empty() {
        "localhost"
    } else {
        host
    }
}

/// Where the bind sequence currently stands. The only legal walk is
/// Starting -> Bound, or Starting -> RetryingAlternatePort -> Bound; anything
/// else is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindPhase {
    Starting,
    RetryingAlternatePort,
}

/// What to do after a failed bind attempt in the given phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindPlan {
    Retry(u16),
    Fatal,
}

pub fn after_bind_failure(phase: BindPhase, kind: ErrorKind, fallback_port: u16) -> BindPlan {
    match (phase, kind) {
        (BindPhase::Starting, ErrorKind::AddrInUse) => BindPlan::Retry(fallback_port),
        _ => BindPlan::Fatal,
    }
}

/// Bind the listening socket (one port-conflict fallback allowed) and serve
/// until ctrl-c. A fatal bind failure is returned to the caller, which exits
/// non-zero.
pub async fn serve(config: &Config, state: Arc<AppState>) -> anyhow::Result<()> {
    let mut phase = BindPhase::Starting;
    let mut port = config.listen_port;
    let listener = loop {
        match TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await {
            Ok(listener) => break listener,
            Err(e) => match after_bind_failure(phase, e.kind(), config.fallback_port) {
                BindPlan::Retry(fallback) => {
                    log::warn!("port {port} in use, retrying on {fallback}...");
                    phase = BindPhase::RetryingAlternatePort;
                    port = fallback;
                }
                BindPlan::Fatal => {
                    anyhow::bail!("failed to bind port {port}: {e}");
                }
            },
        }
    };

    log::info!("contact relay listening on http://0.0.0.0:{port}");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        log::info!("shutdown signal received, stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::{MailTransport, OutgoingMail, TransportError};
    use async_trait::async_trait;

    struct AlwaysOk;

    #[async_trait]
    impl MailTransport for AlwaysOk {
        async fn send(&self, _mail: &OutgoingMail) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl MailTransport for AlwaysFails {
        async fn send(&self, _mail: &OutgoingMail) -> Result<(), TransportError> {
            Err(TransportError::Unavailable("relay down".to_string()))
        }
    }

    fn state(transport: Arc<dyn MailTransport>) -> Arc<AppState> {
        Arc::new(AppState {
            mailer: ContactMailer::new(transport, "dest@example.com".to_string(), None),
        })
    }

    fn valid_request() -> ContactRequest {
        ContactRequest {
            name: "Jo".to_string(),
            email: "j@x.com".to_string(),
            message: "hello".to_string(),
            newsletter: false,
        }
    }

    #[test]
    fn test_first_conflict_retries_on_fallback_port() {
        assert_eq!(
            after_bind_failure(BindPhase::Starting, ErrorKind::AddrInUse, 3001),
            BindPlan::Retry(3001)
        );
    }

    #[test]
    fn test_second_conflict_is_fatal() {
        assert_eq!(
            after_bind_failure(BindPhase::RetryingAlternatePort, ErrorKind::AddrInUse, 3001),
            BindPlan::Fatal
        );
    }

    #[test]
    fn test_non_conflict_bind_errors_are_fatal() {
        assert_eq!(
            after_bind_failure(BindPhase::Starting, ErrorKind::PermissionDenied, 3001),
            BindPlan::Fatal
        );
    }

    #[test]
    fn test_request_host_strips_port() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "example.org:3000".parse().unwrap());
        assert_eq!(request_host(&headers), "example.org");

        assert_eq!(request_host(&HeaderMap::new()), "localhost");
    }

    #[test]
    fn test_request_host_keeps_ipv6_literal_intact() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "[::1]:3000".parse().unwrap());
        assert_eq!(request_host(&headers), "[::1]");

        headers.insert(header::HOST, "[2001:db8::1]".parse().unwrap());
        assert_eq!(request_host(&headers), "[2001:db8::1]");
    }

    #[tokio::test]
    async fn test_contact_endpoint_status_mapping() {
        let (status, Json(outcome)) = contact(
            State(state(Arc::new(AlwaysOk))),
            HeaderMap::new(),
            Json(valid_request()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(outcome.ok);

        let mut invalid = valid_request();
        invalid.email = String::new();
        let (status, Json(outcome)) = contact(
            State(state(Arc::new(AlwaysOk))),
            HeaderMap::new(),
            Json(invalid),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(outcome.error.as_deref(), Some("Missing required fields"));

        let (status, Json(outcome)) = contact(
            State(state(Arc::new(AlwaysFails))),
            HeaderMap::new(),
            Json(valid_request()),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(outcome.error.as_deref(), Some("Failed to send email"));
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let Json(outcome) = health().await;
        assert!(outcome.ok);
        assert!(outcome.error.is_none());
    }
}

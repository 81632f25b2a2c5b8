use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use axum::{routing::get, Router};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio::signal;
use tower_http::trace::TraceLayer;

use crate::{config::TlsConfig, rpc, state::AppState};

const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(rpc::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("rpc_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let status = res.status();
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

/// Serves plain HTTP, or HTTPS when a certificate and key are configured.
pub async fn serve(
    app: Router,
    host: &str,
    port: u16,
    tls: Option<&TlsConfig>,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    let Some(tls) = tls else {
        tracing::info!("listening on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        return Ok(());
    };

    let rustls = load_tls(tls).await?;
    let handle = Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            shutdown_signal().await;
            handle.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        }
    });

    tracing::info!(cert = %tls.cert_path.display(), "listening on {} (tls)", addr);
    axum_server::bind_rustls(addr, rustls)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

async fn load_tls(tls: &TlsConfig) -> anyhow::Result<RustlsConfig> {
    RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .with_context(|| {
            format!(
                "loading tls certificate {} and key {}",
                tls.cert_path.display(),
                tls.key_path.display()
            )
        })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!(signal = "SIGINT", "stopping application"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "stopping application"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn health_responds_ok() {
        let app = build_app(AppState::fake(Arc::new(MemoryStorage::new())));
        let res = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn unreadable_tls_files_fail_startup() {
        let dir = std::env::temp_dir().join(format!("sso-tls-{}", std::process::id()));
        let tls = TlsConfig {
            cert_path: dir.join("missing-cert.pem"),
            key_path: dir.join("missing-key.pem"),
        };
        let err = load_tls(&tls).await.unwrap_err();
        assert!(format!("{err:#}").contains("missing-cert.pem"));

        let err = serve(Router::new(), "127.0.0.1", 0, Some(&tls))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("loading tls certificate"));
    }
}

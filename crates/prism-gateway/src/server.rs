//! HTTP server: accept loop, per-connection service, route dispatch.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::error::ApiError;
use crate::routes::{self, BoxedResponse};
use crate::state::AppState;

/// Binds the configured address and serves until ctrl-c.
pub async fn serve(state: Arc<AppState>) -> std::io::Result<()> {
    let listener = TcpListener::bind(state.config.bind).await?;
    let addr = listener.local_addr()?;
    info!(%addr, "prism gateway listening");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(());
            }
        });
    }

    run(listener, state, shutdown_tx.subscribe()).await;
    Ok(())
}

/// Accept loop over an already-bound listener. Each connection is
/// served by an independent task; requests never serialize behind each
/// other.
pub async fn run(
    listener: TcpListener,
    state: Arc<AppState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        debug!(%peer, "new connection");
                        let state = Arc::clone(&state);
                        tokio::spawn(async move {
                            let io = TokioIo::new(stream);
                            let service = service_fn(move |req| {
                                handle_request(Arc::clone(&state), req)
                            });
                            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                                debug!(error = %e, "connection closed with error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "error accepting connection");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("shutdown signal received, stopping accept loop");
                break;
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Result<BoxedResponse, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = match (method.as_str(), path.as_str()) {
        ("GET", "/api/health") => routes::health(),
        ("GET", "/api/models") => routes::models::get_models(&state).await,
        ("POST", "/api/chat") => routes::chat::post_chat(Arc::clone(&state), req).await,
        ("GET", "/api/weather") => {
            let uri = req.uri().clone();
            routes::weather::get_weather(&state, &uri).await
        }
        ("POST", "/api/search") => routes::search::post_search(&state, req).await,
        ("POST", "/api/training/ensure-model") => {
            routes::training::ensure_model(&state, req).await
        }
        _ => Err(ApiError::not_found()),
    };

    Ok(match result {
        Ok(response) => response,
        Err(err) => {
            debug!(%method, %path, status = %err.status, detail = %err.detail, "request failed");
            err.into_response()
        }
    })
}

/// Binds an ephemeral port and returns the bound address with the
/// running server task's shutdown handle. Used by integration tests.
pub async fn spawn_on_ephemeral_port(
    state: Arc<AppState>,
) -> std::io::Result<(SocketAddr, broadcast::Sender<()>)> {
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    tokio::spawn(run(listener, state, shutdown_rx));
    Ok((addr, shutdown_tx))
}

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::probe::report;
use crate::registry::Registry;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind to {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept connection")]
    Accept(#[source] std::io::Error),
}

pub struct AppState {
    pub registry: Registry,
    pub telemetry_path: String,
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Accept connections until Ctrl-C is received.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), ServerError> {
    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => accepted.map_err(ServerError::Accept)?,
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                return Ok(());
            }
        };

        let state = state.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| handle(req, state.clone()));
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                log::debug!("Connection from {peer} closed with error: {e}");
            }
        });
    }
}

async fn handle(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();
    log::debug!("{} {path}", req.method());
    Ok(route(&path, &state).await)
}

pub async fn route(path: &str, state: &AppState) -> Response<Full<Bytes>> {
    if path == state.telemetry_path {
        metrics(state).await
    } else {
        landing_page(&state.telemetry_path)
    }
}

async fn metrics(state: &AppState) -> Response<Full<Bytes>> {
    let rendered = match state.registry.scrape().await {
        Ok(sink) => sink.render().map(|body| (body, sink.content_type())),
        Err(e) => {
            log::error!("Scrape failed: {}", report(&e));
            return response(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", e.to_string());
        }
    };

    match rendered {
        Ok((body, content_type)) => response(StatusCode::OK, content_type, body),
        Err(e) => {
            log::error!("Failed to encode metrics: {}", report(&e));
            response(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", e.to_string())
        }
    }
}

fn landing_page(telemetry_path: &str) -> Response<Full<Bytes>> {
    let body = format!(
        "<html>
<head><title>Connectivity Exporter</title></head>
<body>
<h1>Connectivity Exporter</h1>
<p><a href='{telemetry_path}'>Metrics</a></p>
</body>
</html>
"
    );
    response(StatusCode::OK, "text/html; charset=utf-8", body)
}

fn response(status: StatusCode, content_type: &'static str, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

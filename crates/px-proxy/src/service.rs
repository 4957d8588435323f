// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reverse proxy service (spec §4.10): a dual HTTP/HTTPS listener that
//! routes requests by subdomain, forwards them to the configured backend
//! over the shared transport, and records every request in the
//! [`RequestStore`] (with body capture wired in when configured).

use crate::capture::CaptureStore;
use crate::request_store::{RequestStore, DEFAULT_CAPACITY};
use crate::router::{self, RouteOutcome};
use crate::tee_body::{CaptureSink, TeeBody};
use crate::transport::{self, TransportConfig};
use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::response::{IntoResponse, Response};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use http::{HeaderMap, HeaderValue, StatusCode};
use px_core::{Clock, Error, ProxyConfig, RequestDetails, RequestRecord, SystemClock};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Hop-by-hop headers that must never be blindly forwarded to the backend
/// (RFC 7230 §6.1), plus `Host` which is replaced by the backend's own.
const HOP_BY_HOP: &[&str] =
    &["connection", "keep-alive", "proxy-authenticate", "proxy-authorization", "te", "trailers", "transfer-encoding", "upgrade", "host"];

/// Bound on how long graceful shutdown waits for in-flight connections to
/// drain before the listeners are torn down regardless.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

struct Listener {
    handle: Handle,
}

impl Listener {
    async fn shutdown(&self) {
        self.handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    }
}

/// Shared state behind every proxied request.
pub struct ProxyService<C: Clock = SystemClock> {
    config: ProxyConfig,
    client: reqwest::Client,
    request_store: Arc<RequestStore>,
    capture_store: Option<Arc<CaptureStore>>,
    clock: C,
    request_seq: AtomicU64,
    cert_config: parking_lot::Mutex<Option<px_core::CertConfig>>,
    http_listener: tokio::sync::Mutex<Option<Listener>>,
    https_listener: tokio::sync::Mutex<Option<Listener>>,
}

impl<C: Clock> ProxyService<C> {
    pub fn new(config: ProxyConfig, clock: C) -> Self {
        let client = transport::build_client(&TransportConfig::default());
        let capture_store = config
            .capture
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| Arc::new(CaptureStore::new(c.dir.clone(), c.max_body_size, c.overflow_to_file)));
        let request_store = Arc::new(RequestStore::new(DEFAULT_CAPACITY));
        if let Some(store) = capture_store.clone() {
            request_store.set_eviction_hook(move |id| {
                let store = Arc::clone(&store);
                let id = id.to_string();
                tokio::spawn(async move { store.cleanup(&id).await });
            });
        }
        Self {
            config,
            client,
            request_store,
            capture_store,
            clock,
            request_seq: AtomicU64::new(0),
            cert_config: parking_lot::Mutex::new(None),
            http_listener: tokio::sync::Mutex::new(None),
            https_listener: tokio::sync::Mutex::new(None),
        }
    }

    pub fn request_store(&self) -> &Arc<RequestStore> {
        &self.request_store
    }

    /// Wired in by the daemon before `start` when `https_port` is
    /// configured; the cert block lives at the top level of the daemon
    /// config, not inside `ProxyConfig` (SPEC_FULL §3).
    pub fn set_cert_config(&self, cert_config: px_core::CertConfig) {
        *self.cert_config.lock() = Some(cert_config);
    }

    fn router(self: &Arc<Self>, https: bool) -> Router {
        Router::new().fallback(handle::<C>).with_state(AppState { service: Arc::clone(self), https })
    }

    /// Start the configured listeners (spec §4.10 "dual listener atomic
    /// startup"): if both ports are configured, HTTP is bound first; if
    /// HTTPS then fails to bind, HTTP is shut back down before returning the
    /// error, so a partial startup never leaves one listener live.
    pub async fn start(self: &Arc<Self>) -> Result<(), Error> {
        let mut started_http = false;
        if let Some(port) = self.config.http_port {
            self.start_http(port).await?;
            started_http = true;
        }
        if let Some(port) = self.config.https_port {
            if let Err(e) = self.start_https(port).await {
                if started_http {
                    self.stop_http().await;
                }
                return Err(e);
            }
        }
        Ok(())
    }

    async fn start_http(self: &Arc<Self>, port: u16) -> Result<(), Error> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let std_listener = std::net::TcpListener::bind(addr)
            .map_err(|e| Error::StartFailed { name: "proxy-http".to_string(), reason: e.to_string() })?;
        std_listener.set_nonblocking(true).map_err(|e| Error::Internal(e.to_string()))?;
        let handle = Handle::new();
        let server_handle = handle.clone();
        let app = self.router(false);
        tokio::spawn(async move {
            let _ = axum_server::from_tcp(std_listener).handle(server_handle).serve(app.into_make_service_with_connect_info::<SocketAddr>()).await;
        });
        *self.http_listener.lock().await = Some(Listener { handle });
        Ok(())
    }

    async fn start_https(self: &Arc<Self>, port: u16) -> Result<(), Error> {
        let cert_config = self
            .https_cert_config()
            .ok_or_else(|| Error::InvalidConfig("https_port set without a certs block".to_string()))?;
        let tls_config = RustlsConfig::from_pem_file(cert_config.cert_path(), cert_config.key_path())
            .await
            .map_err(|e| Error::StartFailed { name: "proxy-https".to_string(), reason: e.to_string() })?;

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let std_listener = std::net::TcpListener::bind(addr)
            .map_err(|e| Error::StartFailed { name: "proxy-https".to_string(), reason: e.to_string() })?;
        std_listener.set_nonblocking(true).map_err(|e| Error::Internal(e.to_string()))?;
        let handle = Handle::new();
        let server_handle = handle.clone();
        let app = self.router(true);
        tokio::spawn(async move {
            let _ = axum_server::from_tcp_rustls(std_listener, tls_config)
                .handle(server_handle)
                .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                .await;
        });
        *self.https_listener.lock().await = Some(Listener { handle });
        Ok(())
    }

    /// Resolved externally (the cert config itself lives in the top-level
    /// config, not in `ProxyConfig`); wired in by the caller via
    /// `with_cert_config` before `start` when HTTPS is configured.
    fn https_cert_config(&self) -> Option<px_core::CertConfig> {
        self.cert_config.lock().clone()
    }

    async fn stop_http(&self) {
        if let Some(listener) = self.http_listener.lock().await.take() {
            listener.shutdown().await;
        }
    }

    pub async fn shutdown(&self) {
        let (http, https) = tokio::join!(
            async { self.http_listener.lock().await.take() },
            async { self.https_listener.lock().await.take() },
        );
        if let Some(listener) = http {
            listener.shutdown().await;
        }
        if let Some(listener) = https {
            listener.shutdown().await;
        }
        self.request_store.shutdown();
    }

    fn next_request_id(&self, method: &str, url: &str) -> String {
        let seq = self.request_seq.fetch_add(1, Ordering::Relaxed);
        RequestRecord::derive_id(self.clock.epoch_ms() * 1_000_000 + seq, method, url)
    }
}

#[derive(Clone)]
struct AppState<C: Clock> {
    service: Arc<ProxyService<C>>,
    https: bool,
}

async fn handle<C: Clock>(
    State(state): State<AppState<C>>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    req: Request,
) -> Response {
    Arc::clone(&state.service).proxy_request(state.https, remote_addr, req).await
}

impl<C: Clock> ProxyService<C> {
    async fn proxy_request(self: Arc<Self>, https: bool, remote_addr: SocketAddr, req: Request) -> Response {
        let start = self.clock.now();
        let (parts, body) = req.into_parts();

        let Some(domain) = self.config.domain.as_deref() else {
            return (StatusCode::NOT_FOUND, "No subdomain specified").into_response();
        };
        let host_header = parts.headers.get(http::header::HOST).and_then(|v| v.to_str().ok()).unwrap_or("");

        let subdomain = match router::route(host_header, domain, &self.config.services) {
            RouteOutcome::NoSubdomain => return (StatusCode::NOT_FOUND, "No subdomain specified").into_response(),
            RouteOutcome::UnknownService { subdomain } => {
                return (StatusCode::NOT_FOUND, format!("Unknown service: {subdomain}")).into_response();
            }
            RouteOutcome::Matched { subdomain } => subdomain,
        };
        let Some(target) = self.config.services.get(&subdomain).cloned() else {
            return (StatusCode::NOT_FOUND, format!("Unknown service: {subdomain}")).into_response();
        };

        let path_and_query = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        let backend_url = format!("http://{}:{}{}", target.host(), target.port(), path_and_query);
        let request_id = self.next_request_id(parts.method.as_str(), path_and_query);

        let mut forward_headers = parts.headers.clone();
        for name in HOP_BY_HOP {
            forward_headers.remove(*name);
        }
        forward_headers.insert("x-forwarded-host", header_value(host_header));
        forward_headers.insert("x-forwarded-proto", HeaderValue::from_static(if https { "https" } else { "http" }));
        let real_ip = resolve_real_ip(&parts.headers, remote_addr);
        forward_headers.insert("x-real-ip", header_value(&real_ip));

        let request_headers = header_pairs(&forward_headers);
        let request_sink = self.capture_store.as_ref().map(|cs| CaptureSink::new(cs.max_body_size()));
        let backend_body: reqwest::Body = match &request_sink {
            Some(sink) => {
                let teed = TeeBody::new(body, sink.clone());
                reqwest::Body::wrap_stream(http_body_util::BodyDataStream::new(teed))
            }
            None => reqwest::Body::wrap_stream(http_body_util::BodyDataStream::new(body)),
        };

        let outcome = self.client.request(parts.method.clone(), &backend_url).headers(forward_headers).body(backend_body).send().await;

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(subdomain = %subdomain, target = %backend_url, error = %e, "backend unavailable");
                let record = RequestRecord {
                    id: request_id,
                    timestamp: self.clock.epoch_ms(),
                    method: parts.method.to_string(),
                    url: path_and_query.to_string(),
                    subdomain,
                    status_code: StatusCode::BAD_GATEWAY.as_u16(),
                    duration_ms: elapsed_ms(self.clock.now(), start),
                    remote_addr: remote_addr.ip().to_string(),
                    details: None,
                };
                self.request_store.record(record);
                return (StatusCode::BAD_GATEWAY, "Backend unavailable").into_response();
            }
        };

        let status = response.status();
        let resp_headers = response.headers().clone();
        let content_type = resp_headers.get(http::header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_string);
        let response_headers = header_pairs(&resp_headers);

        let axum_body = Body::from_stream(response.bytes_stream());
        let out_body = match &self.capture_store {
            Some(capture_store) if status != StatusCode::SWITCHING_PROTOCOLS => {
                let sink = CaptureSink::new(capture_store.max_body_size());
                let capture_store = Arc::clone(capture_store);
                let request_store = Arc::clone(&self.request_store);
                let req_id = request_id.clone();
                let teed = TeeBody::new(axum_body, sink).with_on_complete(move |snapshot| {
                    tokio::spawn(async move {
                        if let Ok(body) = capture_store
                            .persist_retained(&req_id, "response", &snapshot.retained, snapshot.truncated, snapshot.total_len, content_type)
                            .await
                        {
                            request_store.update_details(&req_id, |d| d.response_body = Some(body));
                        }
                    });
                });
                Body::new(teed)
            }
            _ => axum_body,
        };

        let mut builder = Response::builder().status(status);
        for (name, value) in resp_headers.iter() {
            builder = builder.header(name, value);
        }
        let axum_response = match builder.body(out_body) {
            Ok(response) => response,
            Err(_) => return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response(),
        };

        let details = self.capture_store.as_ref().map(|_| RequestDetails {
            request_headers: request_headers.clone(),
            response_headers: response_headers.clone(),
            request_body: None,
            response_body: None,
        });
        let record = RequestRecord {
            id: request_id.clone(),
            timestamp: self.clock.epoch_ms(),
            method: parts.method.to_string(),
            url: path_and_query.to_string(),
            subdomain: subdomain.clone(),
            status_code: status.as_u16(),
            duration_ms: elapsed_ms(self.clock.now(), start),
            remote_addr: remote_addr.ip().to_string(),
            details,
        };
        self.request_store.record(record);

        if let (Some(capture_store), Some(sink)) = (&self.capture_store, &request_sink) {
            let capture_store = Arc::clone(capture_store);
            let request_store = Arc::clone(&self.request_store);
            let sink = sink.clone();
            let req_id = request_id;
            let content_type = request_headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
                .map(|(_, v)| v.clone());
            tokio::spawn(async move {
                let (retained, truncated, total_len) = sink.snapshot();
                if let Ok(body) = capture_store.persist_retained(&req_id, "request", &retained, truncated, total_len, content_type).await {
                    request_store.update_details(&req_id, |d| d.request_body = Some(body));
                }
            });
        }

        axum_response.into_response()
    }
}

fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static(""))
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers.iter().map(|(name, value)| (name.to_string(), value.to_str().unwrap_or("").to_string())).collect()
}

/// Spec §4.10 director header rule: the first `X-Forwarded-For` token, else
/// an existing `X-Real-IP`, else the peer address without its port.
fn resolve_real_ip(headers: &HeaderMap, remote_addr: SocketAddr) -> String {
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = xff.split(',').next() {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }
    remote_addr.ip().to_string()
}

fn elapsed_ms(now: std::time::Instant, start: std::time::Instant) -> u64 {
    now.saturating_duration_since(start).as_millis() as u64
}

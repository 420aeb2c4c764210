//! Development proxy.
//!
//! Sits on the UI origin during development. Requests under the API prefix
//! are forwarded to the API origin with the prefix stripped; everything else
//! is served from the static directory when one is configured.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        header,
        uri::{Authority, Scheme},
        HeaderMap, HeaderValue, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    Json, Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower::ServiceExt;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::DevProxySettings;

pub const BAD_GATEWAY_MESSAGE: &str = "Bad gateway";

/// Headers scoped to a single connection; never forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("invalid proxy target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("could not build upstream request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("proxy server error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
struct BadGatewayBody {
    message: &'static str,
    error: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_GATEWAY,
            Json(BadGatewayBody {
                message: BAD_GATEWAY_MESSAGE,
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Parsed API origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    authority: Authority,
    base_path: String,
}

impl ProxyTarget {
    pub fn parse(target: &str) -> Result<Self, ProxyError> {
        let invalid = |reason: &str| ProxyError::InvalidTarget {
            target: target.to_string(),
            reason: reason.to_string(),
        };

        let uri: Uri = target.parse().map_err(|_| invalid("not a URI"))?;
        if uri.scheme() != Some(&Scheme::HTTP) {
            return Err(invalid("only http:// targets are supported"));
        }
        let authority = uri.authority().cloned().ok_or_else(|| invalid("missing host"))?;

        Ok(Self {
            authority,
            base_path: uri.path().trim_end_matches('/').to_string(),
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Upstream URI for a stripped path and the original query.
    pub fn upstream_uri(&self, path: &str, query: Option<&str>) -> Result<Uri, ProxyError> {
        let mut path_and_query = format!("{}{}", self.base_path, path);
        if path_and_query.is_empty() {
            path_and_query.push('/');
        }
        if let Some(query) = query {
            path_and_query.push('?');
            path_and_query.push_str(query);
        }

        Ok(Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()?)
    }
}

/// `path` with `prefix` removed, when `path` lies under `prefix` on a segment
/// boundary. `/api` maps to `/`.
pub fn strip_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    match path.strip_prefix(prefix)? {
        "" => Some("/"),
        rest if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

fn copy_end_to_end(from: &HeaderMap, to: &mut HeaderMap) {
    for (name, value) in from.iter() {
        if !HOP_BY_HOP.contains(&name.as_str()) {
            to.append(name.clone(), value.clone());
        }
    }
}

/// Forwarder from the UI origin to the API origin.
#[derive(Clone)]
pub struct DevProxy {
    client: Client<HttpConnector, Body>,
    target: Arc<ProxyTarget>,
    prefix: Arc<str>,
}

impl DevProxy {
    pub fn new(settings: &DevProxySettings) -> Result<Self, ProxyError> {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self {
            client,
            target: Arc::new(ProxyTarget::parse(&settings.target)?),
            prefix: Arc::from(settings.path_prefix.as_str()),
        })
    }

    pub fn target(&self) -> &ProxyTarget {
        &self.target
    }

    pub fn matches(&self, path: &str) -> bool {
        strip_prefix(path, &self.prefix).is_some()
    }

    /// Forward one request. The caller has checked [`DevProxy::matches`].
    pub async fn forward(&self, request: Request) -> Result<Response, ProxyError> {
        let (parts, body) = request.into_parts();
        let path = strip_prefix(parts.uri.path(), &self.prefix).unwrap_or("/");
        let uri = self.target.upstream_uri(path, parts.uri.query())?;

        tracing::debug!(
            method = %parts.method,
            from = %parts.uri,
            to = %uri,
            "Proxying request"
        );

        let mut upstream = axum::http::Request::builder()
            .method(parts.method)
            .uri(uri);
        if let Some(headers) = upstream.headers_mut() {
            copy_end_to_end(&parts.headers, headers);
            headers.remove(header::HOST);
            // change-origin: the API sees its own host.
            if let Ok(host) = HeaderValue::from_str(self.target.authority.as_str()) {
                headers.insert(header::HOST, host);
            }
        }
        let upstream = upstream.body(body)?;

        let response = self.client.request(upstream).await?;
        let (mut parts, body) = response.into_parts();
        for name in HOP_BY_HOP {
            parts.headers.remove(name);
        }
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

#[derive(Clone)]
struct ProxyState {
    proxy: DevProxy,
    assets: Option<ServeDir>,
}

async fn dispatch(State(state): State<ProxyState>, request: Request) -> Response {
    if state.proxy.matches(request.uri().path()) {
        let path = request.uri().path().to_owned();
        return match state.proxy.forward(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, %path, "Proxy request failed");
                e.into_response()
            }
        };
    }

    match state.assets {
        Some(assets) => match assets.oneshot(request).await {
            Ok(response) => response.map(Body::new),
            Err(never) => match never {},
        },
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Router for the dev proxy.
pub fn router(proxy: DevProxy, static_dir: Option<&str>) -> Router {
    let state = ProxyState {
        proxy,
        assets: static_dir.map(ServeDir::new),
    };
    Router::new()
        .fallback(dispatch)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve the dev proxy until a shutdown signal arrives.
pub async fn serve(settings: &DevProxySettings) -> Result<(), ProxyError> {
    let proxy = DevProxy::new(settings)?;
    let app = router(proxy, settings.static_dir.as_deref());

    let addr = format!("{}:{}", settings.host, settings.port);
    let listener = TcpListener::bind(addr.as_str())
        .await
        .map_err(|source| ProxyError::Bind {
            addr: addr.clone(),
            source,
        })?;

    tracing::info!(
        address = %listener.local_addr()?,
        prefix = %settings.path_prefix,
        target = %settings.target,
        static_dir = ?settings.static_dir,
        "Dev proxy listening"
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(crate::startup::shutdown_signal())
        .await?;
    Ok(())
}

//! In-process stand-in for the RadosGW admin API, used by tests.

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, Uri, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::net::TcpListener;

#[derive(Clone)]
struct Route {
    status: StatusCode,
    body: String,
    stall_first: usize,
    stall_for: Duration,
}

#[derive(Default)]
struct Inner {
    routes: HashMap<String, Route>,
    hits: HashMap<String, usize>,
    last_authorization: Option<String>,
}

/// Routes are keyed by exact path and query, e.g. `/admin/bucket?bucket=b1`.
/// Unknown routes answer 404.
#[derive(Clone, Default)]
pub struct FakeGateway {
    inner: Arc<Mutex<Inner>>,
}

impl FakeGateway {
    pub fn respond(&self, path_and_query: &str, body: impl Into<String>) {
        self.set(path_and_query, StatusCode::OK, body.into());
    }

    pub fn respond_status(&self, path_and_query: &str, status: StatusCode) {
        self.set(path_and_query, status, String::new());
    }

    /// Hold the first `count` requests to a route for `stall_for` before answering.
    pub fn stall_first(&self, path_and_query: &str, count: usize, stall_for: Duration) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(route) = inner.routes.get_mut(path_and_query) {
            route.stall_first = count;
            route.stall_for = stall_for;
        }
    }

    pub fn remove(&self, path_and_query: &str) {
        self.inner.lock().unwrap().routes.remove(path_and_query);
    }

    pub fn hits(&self, path_and_query: &str) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.hits.get(path_and_query).copied().unwrap_or(0)
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.inner.lock().unwrap().last_authorization.clone()
    }

    /// Serve on an ephemeral local port and return the base URL.
    pub async fn start(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        self.serve(listener)
    }

    /// Serve on an already bound listener and return the base URL.
    pub fn serve(&self, listener: TcpListener) -> String {
        let addr = listener.local_addr().unwrap();
        let app = Router::new().fallback(serve).with_state(self.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn set(&self, path_and_query: &str, status: StatusCode, body: String) {
        self.inner.lock().unwrap().routes.insert(
            path_and_query.to_string(),
            Route {
                status,
                body,
                stall_first: 0,
                stall_for: Duration::ZERO,
            },
        );
    }
}

async fn serve(State(gateway): State<FakeGateway>, uri: Uri, headers: HeaderMap) -> Response {
    let key = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".into());

    let (route, hit) = {
        let mut inner = gateway.inner.lock().unwrap();
        inner.last_authorization = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let hit = {
            let counter = inner.hits.entry(key.clone()).or_insert(0);
            *counter += 1;
            *counter
        };
        (inner.routes.get(&key).cloned(), hit)
    };

    let Some(route) = route else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if hit <= route.stall_first {
        tokio::time::sleep(route.stall_for).await;
    }
    (route.status, route.body).into_response()
}

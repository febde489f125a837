//! In-process stand-in for the review backend, bound to an ephemeral port.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub struct FakeBackend {
    pub url: String,
    hits: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn spawn(router: Router) -> Self {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let recorder = hits.clone();

        let app = router
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(middleware::from_fn(move |req: Request, next: Next| {
                let recorder = recorder.clone();
                async move {
                    let line = match req.uri().query() {
                        Some(q) => format!("{} {}?{}", req.method(), req.uri().path(), q),
                        None => format!("{} {}", req.method(), req.uri().path()),
                    };
                    recorder.lock().await.push(line);
                    next.run(req).await
                }
            }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend addr");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            url: format!("http://{}", addr),
            hits,
            handle,
        }
    }

    /// Requests seen so far, as `METHOD /path?query`.
    pub async fn hits(&self) -> Vec<String> {
        self.hits.lock().await.clone()
    }

    /// Hits with the query string dropped.
    pub async fn paths(&self) -> Vec<String> {
        self.hits()
            .await
            .into_iter()
            .map(|h| h.split('?').next().unwrap_or_default().to_string())
            .collect()
    }

    /// A URL nothing is listening on.
    pub async fn closed_url() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind probe");
        let addr = listener.local_addr().expect("probe addr");
        drop(listener);
        format!("http://{}", addr)
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

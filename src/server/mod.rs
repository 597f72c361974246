//! HTTP trigger for import runs.
//!
//! Two POST endpoints start a run in the background and answer at once; a
//! request that arrives while a run is active is refused with 409.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;

use crate::ingest::Importer;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub importer: Importer,
}

impl AppState {
    pub fn new(importer: Importer) -> Self {
        Self { importer }
    }
}

/// Start the web server.
pub async fn serve(importer: Importer, bind: &str) -> anyhow::Result<()> {
    let app = create_router(AppState::new(importer));

    let addr: SocketAddr = bind.parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::ingest::ImportOptions;
    use crate::repository::DbContext;
    use crate::source::LocalDirSource;

    async fn setup_test_app() -> (axum::Router, Importer, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_sqlite_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let store = Arc::new(ctx.store());

        let importer = Importer::new(
            Arc::new(LocalDirSource::new(dir.path().join("in"))),
            store.clone(),
            store,
            ImportOptions::default(),
        );
        let app = create_router(AppState::new(importer.clone()));
        (app, importer, dir)
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _importer, _dir) = setup_test_app().await;

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_import_accepted() {
        let (app, _importer, _dir) = setup_test_app().await;

        let response = app.oneshot(post("/api/reviews/import-jl")).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_text(response).await, "Import started");
    }

    #[tokio::test]
    async fn test_import_conflict_while_running() {
        let (app, importer, _dir) = setup_test_app().await;
        let _held = importer.gate().try_start().unwrap();

        let response = app
            .clone()
            .oneshot(post("/api/reviews/import-jl"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .oneshot(post("/api/reviews/import-jl-folder"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_import_requires_post() {
        let (app, _importer, _dir) = setup_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/reviews/import-jl")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}

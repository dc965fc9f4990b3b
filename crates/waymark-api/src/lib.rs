pub mod handlers;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::ApiState;

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::handle_root))
        .route("/status", get(handlers::handle_status))
        .route("/token/{id}", get(handlers::handle_token))
        .route(
            "/erc721/{collection}/{token_number}",
            get(handlers::handle_erc721),
        )
        .route("/ext/{*uri}", get(handlers::handle_ext))
        .route("/ipfs/{*path}", get(handlers::handle_ipfs))
        .with_state(state)
        .layer(cors)
}

pub async fn serve(state: ApiState, port: u16) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!(port, "API listening on 0.0.0.0");
    axum::serve(listener, app).await?;
    Ok(())
}

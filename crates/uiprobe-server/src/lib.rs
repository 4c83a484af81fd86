//! Embeddable HTTP surface for the uiprobe endpoint
//!
//! Thin axum adapters over the [`uiprobe_core::ProbeContext`] entry points.
//! The host application builds a context, keeps servicing the bridge from
//! its render loop, and runs [`serve`] on a background runtime.

use axum::Router;
use axum::routing::{get, post};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use uiprobe_core::ProbeContext;

pub mod routes;

/// Build the endpoint router around a probe context.
pub fn router(ctx: ProbeContext) -> Router {
    Router::new()
        .route("/version", get(routes::query::version))
        .route("/tree", get(routes::query::tree))
        .route("/inspect/:id", get(routes::query::inspect))
        .route("/select", post(routes::query::select))
        .route("/exists", post(routes::query::exists))
        .route("/setattr", post(routes::query::setattr))
        .route("/click", post(routes::query::click))
        .route("/pick", get(routes::query::pick))
        .route("/sendkeycodes", post(routes::query::sendkeycodes))
        .route("/screenshot/:fmt", get(routes::screen::screenshot))
        .route("/screenstream/:fmt", get(routes::screen::screenstream))
        .with_state(ctx)
}

/// Bind and serve until the process exits.
pub async fn serve(addr: SocketAddr, ctx: ProbeContext) -> anyhow::Result<()> {
    let app = router(ctx);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("uiprobe endpoint listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

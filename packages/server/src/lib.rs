pub mod announcement;
pub mod certificate;
pub mod config;
pub mod consumers;
pub mod database;
pub mod entity;
pub mod error;
pub mod finalize;
pub mod handlers;
pub mod models;
pub mod notification;
pub mod phase;
pub mod routes;
pub mod state;

use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Podium Results API",
        version = "1.0.0",
        description = "Internal operator API for hackathon lifecycle and results publication"
    ),
    tags(
        (name = "Lifecycle", description = "Derived lifecycle phase of a hackathon"),
        (name = "Results", description = "Winner selection, certificates and announcement"),
    ),
)]
struct ApiDoc;

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes())
        .split_for_parts();

    router
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
        .layer(TraceLayer::new_for_http())
}

use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/hackathons", hackathon_routes())
}

fn hackathon_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::hackathon::get_phase))
        .routes(routes!(handlers::hackathon::refresh_hackathon_phase))
        .routes(routes!(handlers::hackathon::finalize))
}

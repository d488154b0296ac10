pub mod families;
pub mod health;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::constants::IMAGE_ROUTE;
use crate::AppState;

pub use health::health_check;
pub use validation::parse_user_ids;

/// Headroom over the image limit for the JSON part and multipart framing
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Routes rooted at `/families`
fn family_routes() -> Router<AppState> {
    Router::new()
        .route("/family", post(families::create_family))
        .route("/inviteCode", post(families::get_family_by_invite_code))
        .route("/myfamilies", get(families::get_my_families))
        .route(
            "/:family_id",
            get(families::get_family)
                .patch(families::update_upload_cycle)
                .delete(families::delete_family),
        )
        .route(
            "/:family_id/created",
            get(families::get_family_created_nickname),
        )
        .route(
            "/:family_id/users",
            get(families::get_family_all_members).delete(families::emission_family),
        )
        .route("/:family_id/join", post(families::join_family))
        .route("/:family_id/invitations", post(families::invite_user))
        .route(
            "/:family_id/invitations/accept",
            patch(families::accept_family),
        )
        .route(
            "/:family_id/invitations/reject",
            patch(families::reject_family),
        )
        .route("/:family_id/update", patch(families::update_family))
        .route(
            "/:family_id/withdraw",
            axum::routing::delete(families::withdraw_family),
        )
        .route(
            "/:family_id/authority",
            get(families::get_family_authority).patch(families::change_family_authority),
        )
        .route("/:family_id/famillyName", get(families::get_family_name))
}

/// Build the application router without CORS, which `main` layers on from config
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_image_bytes + MULTIPART_OVERHEAD_BYTES;
    let images = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/health", get(health_check))
        .nest("/families", family_routes())
        .nest_service(IMAGE_ROUTE, images)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

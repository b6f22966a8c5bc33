//! API router.
//!
//! Returns a composable `Router` with all routes nested under `/api/`.
//! Registration and login are public; everything else goes through the
//! bearer token auth middleware.

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::AppState;

pub fn api_router(core: Arc<AppState>) -> Router {
    build_router(ApiContext::new(core))
}

/// Build router from a pre-constructed `ApiContext`. Used by integration
/// tests that need to share the session store across router instances.
#[cfg(test)]
pub(crate) fn api_router_with_ctx(ctx: ApiContext) -> Router {
    build_router(ctx)
}

fn build_router(ctx: ApiContext) -> Router {
    // Middleware uses `Extension<ApiContext>` (outermost layer); handlers
    // use `State<ApiContext>` via with_state.
    //
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/auth/logout", post(endpoints::auth::logout))
        .route("/me", get(endpoints::auth::me).put(endpoints::auth::update_profile))
        .route(
            "/appointments",
            get(endpoints::appointments::list).post(endpoints::appointments::book),
        )
        .route(
            "/appointments/:id",
            get(endpoints::appointments::detail).put(endpoints::appointments::reschedule),
        )
        .route("/appointments/:id/action", post(endpoints::appointments::action))
        .route("/appointments/:id/cancel", post(endpoints::appointments::cancel))
        .route(
            "/appointments/:id/confirm-completion",
            post(endpoints::appointments::confirm_completion),
        )
        .route("/appointments/:id/acknowledge", post(endpoints::appointments::acknowledge))
        .route("/appointments/:id/rating", post(endpoints::appointments::rate))
        .route("/appointments/:id/receipt", get(endpoints::appointments::receipt))
        .route(
            "/appointments/:id/messages",
            get(endpoints::messages::thread)
                .post(endpoints::messages::send)
                .delete(endpoints::messages::delete_conversation),
        )
        .route("/appointments/:id/messages/read", post(endpoints::messages::mark_read))
        .route("/messages", get(endpoints::messages::inbox))
        .route("/messages/:id", delete(endpoints::messages::delete_message))
        .route("/doctors", get(endpoints::doctors::directory))
        .route("/doctors/me/availability", put(endpoints::doctors::set_availability))
        .route("/doctors/me/schedule", put(endpoints::doctors::upsert_schedule))
        .route("/doctors/me/dashboard", get(endpoints::doctors::dashboard))
        .route("/doctors/me/patients", get(endpoints::doctors::patients))
        .route("/doctors/:id", get(endpoints::doctors::profile))
        .route("/notifications", get(endpoints::notifications::list))
        .route("/notifications/read-all", post(endpoints::notifications::mark_all_read))
        .route("/notifications/unread-count", get(endpoints::notifications::unread_count))
        .route("/notifications/:id/read", post(endpoints::notifications::mark_read))
        .route("/notifications/:id", delete(endpoints::notifications::delete))
        .route("/admin/doctors", post(endpoints::admin::create_doctor))
        .route("/admin/doctors/pending", get(endpoints::admin::pending_doctors))
        .route("/admin/doctors/:id", put(endpoints::admin::edit_doctor))
        .route("/admin/doctors/:id/approve", post(endpoints::admin::approve_doctor))
        .route("/admin/stats", get(endpoints::admin::stats))
        .route("/admin/appointments", get(endpoints::admin::all_appointments))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::Extension(ctx.clone()));

    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/register", post(endpoints::auth::register))
        .route("/auth/register-doctor", post(endpoints::auth::register_doctor))
        .route("/auth/login", post(endpoints::auth::login))
        .with_state(ctx.clone())
        .layer(axum::Extension(ctx));

    Router::new()
        .nest("/api", protected)
        .nest("/api", public)
        .layer(tower_http::cors::CorsLayer::permissive())
}

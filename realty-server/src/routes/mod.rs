//! HTTP routes for the marketplace

mod admin;
mod auth;
mod collections;
mod properties;
mod rpc;
mod session;
mod viewings;

pub use admin::{ADMIN_COOKIE, ADMIN_COOKIE_MAX_AGE_SECS};
pub use collections::MAX_COMPARISON_ENTRIES;
pub use rpc::RpcInput;
pub use session::{all_session_cookies, LEGACY_SESSION_COOKIES, SESSION_COOKIE};

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_cookies::CookieManagerLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::notify::Notifier;
use crate::oauth::IdentityProvider;
use crate::state::AppState;
use crate::store::Store;

/// Create the router with all routes
pub fn create_router<S, P, N>(state: Arc<AppState<S, P, N>>) -> Router
where
    S: Store + 'static,
    P: IdentityProvider + 'static,
    N: Notifier + 'static,
{
    let static_dir = state.config.static_dir.clone();

    // Everything under /admin except login/logout sits behind the token gate
    let admin_ui = Router::new()
        .route("/login", get(admin::login_page).post(admin::login::<S, P, N>))
        .route("/logout", post(admin::logout))
        .fallback_service(ServeDir::new(static_dir))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin::admin_gate::<S, P, N>,
        ));

    Router::new()
        .route("/api/oauth/callback", get(auth::oauth_callback::<S, P, N>))
        .route("/api/auth/me", get(auth::me::<S, P, N>))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/register", post(auth::register::<S, P, N>))
        .route("/api/auth/login", post(auth::login::<S, P, N>))
        .route("/logout", get(auth::logout_redirect))
        // Viewings
        .route("/api/rpc/viewings.create", post(viewings::create::<S, P, N>))
        .route("/api/rpc/viewings.mine", post(viewings::mine::<S, P, N>))
        .route("/api/rpc/viewingsAdmin.listAll", post(viewings::list_all::<S, P, N>))
        .route(
            "/api/rpc/viewingsAdmin.updateStatus",
            post(viewings::update_status::<S, P, N>),
        )
        .route(
            "/api/rpc/viewingsAdmin.bulkUpdateStatus",
            post(viewings::bulk_update_status::<S, P, N>),
        )
        .route("/api/rpc/viewingsAdmin.delete", post(viewings::delete::<S, P, N>))
        // Properties
        .route("/api/rpc/properties.list", post(properties::list::<S, P, N>))
        .route("/api/rpc/properties.get", post(properties::get::<S, P, N>))
        .route("/api/rpc/propertiesAdmin.create", post(properties::create::<S, P, N>))
        .route("/api/rpc/propertiesAdmin.update", post(properties::update::<S, P, N>))
        .route("/api/rpc/propertiesAdmin.delete", post(properties::delete::<S, P, N>))
        .route(
            "/api/rpc/propertiesAdmin.setStatus",
            post(properties::set_status::<S, P, N>),
        )
        .route("/api/rpc/images.add", post(properties::add_image::<S, P, N>))
        .route("/api/rpc/images.reorder", post(properties::reorder_images::<S, P, N>))
        .route("/api/rpc/images.delete", post(properties::delete_image::<S, P, N>))
        // Collections
        .route("/api/rpc/favorites.list", post(collections::list_favorites::<S, P, N>))
        .route("/api/rpc/favorites.add", post(collections::add_favorite::<S, P, N>))
        .route("/api/rpc/favorites.remove", post(collections::remove_favorite::<S, P, N>))
        .route(
            "/api/rpc/savedSearches.list",
            post(collections::list_saved_searches::<S, P, N>),
        )
        .route(
            "/api/rpc/savedSearches.create",
            post(collections::create_saved_search::<S, P, N>),
        )
        .route(
            "/api/rpc/savedSearches.delete",
            post(collections::delete_saved_search::<S, P, N>),
        )
        .route("/api/rpc/comparison.list", post(collections::list_comparison::<S, P, N>))
        .route("/api/rpc/comparison.add", post(collections::add_comparison::<S, P, N>))
        .route(
            "/api/rpc/comparison.remove",
            post(collections::remove_comparison::<S, P, N>),
        )
        .route("/api/rpc/comparison.clear", post(collections::clear_comparison::<S, P, N>))
        .nest("/admin", admin_ui)
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

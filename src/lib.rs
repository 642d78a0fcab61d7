pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;
pub mod types;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use state::AppState;

/// Full application router with CORS and request tracing
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use axum::routing::post;
    use handlers::public::{auth, database, ecopontos, health, sugestoes};

    Router::new()
        .route("/health", get(health::health))
        .route("/full-db", get(database::full_db))
        .route("/register", post(auth::register))
        .route("/ecopontos", get(ecopontos::list).post(ecopontos::create))
        .route(
            "/ecopontos/:id",
            get(ecopontos::get)
                .put(ecopontos::update)
                .delete(ecopontos::delete),
        )
        .route("/sugestoes_ecopontos", post(sugestoes::create))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::users;

    Router::new()
        .route("/users/me", get(users::me))
        .route_layer(from_fn_with_state(state, middleware::require_identity))
}

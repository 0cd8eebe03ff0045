use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower_cookies::CookieManagerLayer;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{auth, comments, health_check, tickets, uploads, users};
use crate::state::AppState;
use crate::uploads::PUBLIC_PREFIX;

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/logout-all", post(auth::logout_all))
        .route("/me", get(auth::me))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users))
        .route("/me", get(users::get_profile).patch(users::update_profile))
}

fn ticket_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(tickets::list_tickets).post(tickets::create_ticket))
        .route("/history", get(tickets::ticket_history))
        .route("/:id", get(tickets::get_ticket).patch(tickets::update_ticket))
        .route("/:id/assign", patch(tickets::claim_ticket))
        .route("/:id/close", patch(tickets::close_ticket))
        .route("/:id/approve", patch(tickets::close_ticket))
        .route(
            "/:id/comments",
            get(comments::list_comments).post(comments::add_comment),
        )
}

fn upload_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", post(uploads::upload_image))
        .route("/avatar", post(uploads::upload_avatar))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

pub fn create_routes(state: AppState) -> Router {
    let config = state.config.clone();

    let api = Router::new()
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .nest("/tickets", ticket_routes())
        .nest("/upload", upload_routes(config.max_upload_bytes));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .nest_service(PUBLIC_PREFIX, ServeDir::new(state.uploads.root()))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(&config))
        .layer(create_cors_layer(&config))
        .with_state(state)
}

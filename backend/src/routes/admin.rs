use crate::{AppState, handlers::{operations, roles, users}};
use axum::{
    Router,
    routing::get,
};

/// Admin Router Module
///
/// User and role management. Each handler requires its own named operation
/// (`List Users`, `Add Role`, ...), so access follows whatever the caller's role grants
/// rather than a fixed admin flag.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Users ---
        .route("/users", get(users::list_users).post(users::add_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // --- Operations ---
        // GET /operations/verify?operation=Add%20Role
        // 200 when the caller's role holds the operation, 403 otherwise.
        .route("/operations/verify", get(operations::verify_operation))
        .route("/operations/all", get(operations::list_operations))
        // --- Roles ---
        .route("/roles", get(roles::list_roles).post(roles::create_role))
        // Any authenticated user; feeds role pickers.
        .route("/roles/all", get(roles::all_roles))
        .route(
            "/roles/{id}",
            get(roles::get_role)
                .put(roles::update_role)
                .delete(roles::delete_role),
        )
}

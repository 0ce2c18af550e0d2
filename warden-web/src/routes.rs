//! API route definitions
//!
//! Gating middleware is attached with `route_layer` so it runs only when a
//! route actually matched; unmatched paths still produce plain 404/405
//! responses from the router.

use crate::handlers::{admin, auth, health, resources};
use crate::middleware::{self, ElementGuard};
use crate::AppState;
use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};

/// Build the `/api` router
pub fn api_routes(state: AppState) -> Router<AppState> {
    let products = Router::new()
        .route(
            "/products",
            get(resources::list_products).post(resources::create_product),
        )
        .route(
            "/products/{id}",
            get(resources::get_product)
                .put(resources::update_product)
                .delete(resources::delete_product),
        )
        .route_layer(from_fn_with_state(
            ElementGuard::new(state.clone(), "products"),
            middleware::guard_element,
        ));

    let orders = Router::new()
        .route(
            "/orders",
            get(resources::list_orders).post(resources::create_order),
        )
        .route(
            "/orders/{id}",
            get(resources::get_order)
                .put(resources::update_order)
                .delete(resources::delete_order),
        )
        .route_layer(from_fn_with_state(
            ElementGuard::new(state.clone(), "orders"),
            middleware::guard_element,
        ));

    let admin_routes = Router::new()
        .route("/roles", get(admin::list_roles).post(admin::create_role))
        .route(
            "/roles/{id}",
            put(admin::update_role).delete(admin::delete_role),
        )
        .route("/roles/{id}/rules", get(admin::role_rules))
        .route(
            "/elements",
            get(admin::list_elements).post(admin::create_element),
        )
        .route(
            "/elements/{id}",
            put(admin::update_element).delete(admin::delete_element),
        )
        .route("/rules", get(admin::list_rules).post(admin::create_rule))
        .route(
            "/rules/{id}",
            put(admin::update_rule).delete(admin::delete_rule),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::guard_admin));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route(
            "/auth/profile",
            put(auth::update_profile).patch(auth::update_profile),
        )
        .route("/auth/logout", post(auth::logout))
        .route("/auth/account", delete(auth::delete_account))
        .merge(products)
        .merge(orders)
        .nest("/admin", admin_routes)
}

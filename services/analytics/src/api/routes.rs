//! 路由表

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::api::state::AppState;

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let api = Router::new()
        .route("/reports/overview", get(handlers::overview))
        .route("/reports/by-date", get(handlers::report_by_date))
        .route("/reports/by-status", get(handlers::report_by_status))
        .route("/reports/by-hour", get(handlers::report_by_hour))
        .route(
            "/reports/by-payment-method",
            get(handlers::report_by_payment_method),
        )
        .route("/reports/top-users", get(handlers::report_top_users))
        .route("/reports/funnel", get(handlers::report_funnel))
        .route("/reports/refunds", get(handlers::report_refunds))
        .route("/reports/user-activity", get(handlers::report_user_activity))
        .route("/kpis", get(handlers::kpis))
        .route("/kpis/comparison", get(handlers::kpi_comparison))
        .route("/transactions", get(handlers::list_transactions))
        .route("/search", get(handlers::search))
        .route(
            "/notifications/generate",
            post(handlers::generate_notifications),
        )
        .route("/notifications", get(handlers::list_notifications))
        .route(
            "/notifications/{id}/read",
            post(handlers::mark_notification_read),
        )
        .route(
            "/notifications/read-all",
            post(handlers::mark_all_notifications_read),
        )
        .route("/notifications/unread-count", get(handlers::unread_count))
        .route("/exports", post(handlers::export_report));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::prometheus_metrics))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

//! HTTP handler 实现
//!
//! 只做参数校验与编排，聚合语义全部在 application 层。

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pulse_common::types::NotificationId;
use pulse_common::Page;
use pulse_errors::AppError;
use serde_json::json;

use crate::api::dto::{
    DateRangeQuery, ExportRequest, MarkReadResponse, NotificationListQuery, NotificationPath,
    SearchQuery, TopUsersQuery, TransactionTableQuery,
};
use crate::api::state::AppState;
use crate::api::ApiResult;
use crate::application::alerts::EvaluationSummary;
use crate::application::insight::InsightResponse;
use crate::domain::model::{
    BreakdownDimension, BreakdownEntry, ComparisonResult, GroupDimension, KpiSnapshot,
    TransactionRecord,
};
use crate::domain::notification::Notification;

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut status = pulse_telemetry::HealthStatus::new();
    let database = state.notifications.count_unread().await;
    status.add_check(
        "database",
        database.is_ok(),
        database.err().map(|e| e.to_string()),
    );
    Json(json!({
        "status": if status.healthy { "ok" } else { "degraded" },
        "checks": status
            .checks
            .iter()
            .map(|c| json!({ "name": c.name, "healthy": c.healthy, "message": c.message }))
            .collect::<Vec<_>>(),
    }))
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> String {
    state.prometheus.render()
}

pub async fn overview(
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let window = range.to_window()?;
    let snapshot = state.kpis.compute(&window).await?;
    Ok(Json(json!({
        "window": window.label(),
        "kpis": snapshot,
    })))
}

pub async fn kpis(
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Json<KpiSnapshot>> {
    let window = range.to_window()?;
    Ok(Json(state.kpis.compute(&window).await?))
}

pub async fn kpi_comparison(
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Json<ComparisonResult>> {
    let window = range.to_window()?;
    Ok(Json(state.comparator.compare(&window).await?))
}

pub async fn report_by_date(
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let window = range.to_window()?;
    let rows = state
        .store
        .grouped_aggregate(&window, GroupDimension::Date)
        .await?;
    Ok(Json(json!({ "rows": rows })))
}

pub async fn report_by_status(
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Json<Vec<BreakdownEntry>>> {
    breakdown_report(state, range, BreakdownDimension::Status).await
}

pub async fn report_by_hour(
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Json<Vec<BreakdownEntry>>> {
    breakdown_report(state, range, BreakdownDimension::HourOfDay).await
}

pub async fn report_by_payment_method(
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Json<Vec<BreakdownEntry>>> {
    breakdown_report(state, range, BreakdownDimension::PaymentMethod).await
}

pub async fn report_funnel(
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Json<Vec<BreakdownEntry>>> {
    breakdown_report(state, range, BreakdownDimension::FunnelStage).await
}

async fn breakdown_report(
    state: AppState,
    range: DateRangeQuery,
    dimension: BreakdownDimension,
) -> ApiResult<Json<Vec<BreakdownEntry>>> {
    let window = range.to_window()?;
    Ok(Json(state.breakdowns.breakdown(dimension, &window).await?))
}

pub async fn report_top_users(
    State(state): State<AppState>,
    Query(query): Query<TopUsersQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let window = query.to_window()?;
    let limit = query.limit()?;
    let rows = state.store.top_n(&window, limit).await?;
    Ok(Json(json!({ "rows": rows })))
}

/// 退款与出款量，按交易类型切分
pub async fn report_refunds(
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let window = range.to_window()?;
    let rows = state
        .store
        .grouped_aggregate(&window, GroupDimension::TransactionType)
        .await?;
    let rows: Vec<_> = rows
        .into_iter()
        .filter(|r| r.label == "refund" || r.label == "payout")
        .collect();
    Ok(Json(json!({ "rows": rows })))
}

/// 用户活跃报表：窗口内每日新增用户
pub async fn report_user_activity(
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let window = range.to_window()?;
    let days = state.store.new_users_by_day(&window).await?;
    Ok(Json(json!({ "rows": days })))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionTableQuery>,
) -> ApiResult<Json<Page<TransactionRecord>>> {
    let window = query.to_window()?;
    let filter = query.filter();
    filter.validate()?;
    let pagination = query.pagination();
    pagination
        .validate()
        .map_err(AppError::invalid_parameter)?;
    let page = state
        .store
        .list_transactions(
            &window,
            &filter,
            &pagination,
            query.sort_field(),
            query.sort_direction(),
        )
        .await?;
    Ok(Json(page))
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<InsightResponse>> {
    let window = query.to_window()?;
    Ok(Json(state.insights.route(&query.q, &window).await?))
}

pub async fn generate_notifications(
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Json<EvaluationSummary>> {
    let window = range.to_window()?;
    Ok(Json(state.evaluator.run_cycle(&window).await?))
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationListQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    let limit = query.limit.unwrap_or(50).min(200);
    Ok(Json(state.notifications.list_recent(limit).await?))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(path): Path<NotificationPath>,
) -> ApiResult<Json<MarkReadResponse>> {
    let id = NotificationId::from_uuid(path.id);
    if !state.notifications.mark_read(id).await? {
        return Err(AppError::not_found(format!("Notification {} not found", id)).into());
    }
    Ok(Json(MarkReadResponse { updated: 1 }))
}

pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
) -> ApiResult<Json<MarkReadResponse>> {
    let updated = state.notifications.mark_all_read().await?;
    Ok(Json(MarkReadResponse { updated }))
}

pub async fn unread_count(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let count = state.notifications.count_unread().await?;
    Ok(Json(json!({ "unread": count })))
}

pub async fn export_report(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> ApiResult<Response> {
    let window = request.to_window()?;
    let file = state
        .exports
        .export(request.metric, request.format, &window)
        .await?;
    let headers = [
        (header::CONTENT_TYPE, file.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.filename),
        ),
    ];
    Ok((headers, file.body).into_response())
}

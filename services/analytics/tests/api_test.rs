//! HTTP API 集成测试
//!
//! 使用内存仓储驱动完整路由，不依赖数据库。

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use rust_decimal::Decimal;
use tower::ServiceExt;

use analytics::api::routes::build_router;
use analytics::api::state::AppState;
use analytics::domain::model::{
    DailyCount, GroupDimension, GroupedRow, RawAggregates, TopEntityRow, TransactionFilter,
    TransactionRecord, TransactionSortField,
};
use analytics::domain::notification::Notification;
use analytics::domain::repositories::{MetricStore, NotificationRepository};
use pulse_common::types::NotificationId;
use pulse_common::{Page, Pagination, SortDirection, TimeWindow};
use pulse_errors::AppResult;

struct FixedMetricStore;

#[async_trait]
impl MetricStore for FixedMetricStore {
    async fn aggregate(
        &self,
        _window: &TimeWindow,
        _filter: &TransactionFilter,
    ) -> AppResult<RawAggregates> {
        Ok(RawAggregates {
            total_count: 132,
            pending_count: 6,
            success_count: 114,
            failed_count: 11,
            successful_payment_sum: Decimal::from(57_000),
            successful_payment_count: 100,
            failed_sum: Decimal::from(4_400),
            new_users: 18,
        })
    }

    async fn grouped_aggregate(
        &self,
        _window: &TimeWindow,
        dimension: GroupDimension,
    ) -> AppResult<Vec<GroupedRow>> {
        Ok(match dimension {
            GroupDimension::Status => vec![
                GroupedRow {
                    label: "pending".to_string(),
                    count: 6,
                    sum: Decimal::from(1_200),
                },
                GroupedRow {
                    label: "success".to_string(),
                    count: 114,
                    sum: Decimal::from(57_000),
                },
                GroupedRow {
                    label: "failed".to_string(),
                    count: 11,
                    sum: Decimal::from(4_400),
                },
            ],
            _ => Vec::new(),
        })
    }

    async fn top_n(&self, _window: &TimeWindow, _n: u32) -> AppResult<Vec<TopEntityRow>> {
        Ok(Vec::new())
    }

    async fn total_users_as_of(&self, _instant: DateTime<Utc>) -> AppResult<i64> {
        Ok(1_000)
    }

    async fn new_users_by_day(&self, _window: &TimeWindow) -> AppResult<Vec<DailyCount>> {
        Ok(Vec::new())
    }

    async fn list_transactions(
        &self,
        _window: &TimeWindow,
        _filter: &TransactionFilter,
        pagination: &Pagination,
        _sort_field: TransactionSortField,
        _sort_direction: SortDirection,
    ) -> AppResult<Page<TransactionRecord>> {
        Ok(Page {
            items: Vec::new(),
            total: 0,
            page: pagination.page,
            page_size: pagination.page_size,
        })
    }
}

#[derive(Default)]
struct InMemoryNotifications {
    items: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationRepository for InMemoryNotifications {
    async fn exists_since(&self, notification_type: &str, since: DateTime<Utc>) -> AppResult<bool> {
        let items = self.items.lock().unwrap();
        Ok(items
            .iter()
            .any(|n| n.notification_type == notification_type && n.created_at >= since))
    }

    async fn insert(&self, notification: &Notification) -> AppResult<NotificationId> {
        self.items.lock().unwrap().push(notification.clone());
        Ok(notification.id)
    }

    async fn mark_read(&self, id: NotificationId) -> AppResult<bool> {
        let mut items = self.items.lock().unwrap();
        match items.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self) -> AppResult<u64> {
        let mut items = self.items.lock().unwrap();
        let mut updated = 0;
        for n in items.iter_mut().filter(|n| !n.read) {
            n.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn list_recent(&self, limit: u32) -> AppResult<Vec<Notification>> {
        let items = self.items.lock().unwrap();
        Ok(items.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn count_unread(&self) -> AppResult<i64> {
        Ok(self.items.lock().unwrap().iter().filter(|n| !n.read).count() as i64)
    }
}

fn test_router() -> axum::Router {
    let recorder = PrometheusBuilder::new().build_recorder();
    let state = AppState::new(
        Arc::new(FixedMetricStore),
        Arc::new(InMemoryNotifications::default()),
        recorder.handle(),
    );
    build_router(state, Duration::from_secs(5))
}

async fn get_json(router: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (status, body) = get_json(test_router(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_kpis_endpoint_returns_snapshot() {
    let (status, body) = get_json(
        test_router(),
        "/api/v1/kpis?start_date=2025-06-01&end_date=2025-06-30",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_transactions"], 132);
    assert_eq!(body["success_rate"], "86.36");
}

#[tokio::test]
async fn test_reversed_date_range_rejected_with_problem_details() {
    let (status, body) = get_json(
        test_router(),
        "/api/v1/kpis?start_date=2025-06-30&end_date=2025-06-01",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(body["type"].as_str().unwrap().contains("invalid-range"));
}

#[tokio::test]
async fn test_inverted_amount_filter_rejected_with_problem_details() {
    let (status, body) = get_json(
        test_router(),
        "/api/v1/transactions?start_date=2025-06-01&end_date=2025-06-30&min_amount=100&max_amount=50",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(body["type"].as_str().unwrap().contains("invalid-parameter"));
}

#[tokio::test]
async fn test_status_report_percentages() {
    let (status, body) = get_json(
        test_router(),
        "/api/v1/reports/by-status?start_date=2025-06-01&end_date=2025-06-30",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries[0]["label"], "success");
    assert_eq!(entries[0]["percentage"], "86.36");
}

#[tokio::test]
async fn test_search_routes_failed_query() {
    let (status, body) = get_json(
        test_router(),
        "/api/v1/search?q=failed%20transactions&start_date=2025-06-01&end_date=2025-06-30",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matched_insight"], "FAILED_SUMMARY");
    assert_eq!(body["data"]["failed_transactions"], 11);
}

#[tokio::test]
async fn test_unknown_search_returns_no_match() {
    let (status, body) = get_json(
        test_router(),
        "/api/v1/search?q=zzz-no-such-thing&start_date=2025-06-01&end_date=2025-06-30",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["matched_insight"].is_null());
    assert!(body["data"]["suggestions"].is_array());
}

#[tokio::test]
async fn test_mark_read_unknown_notification_is_404() {
    let router = test_router();
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/notifications/00000000-0000-0000-0000-000000000000/read")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_generate_then_list_notifications() {
    let router = test_router();
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/notifications/generate?start_date=2025-06-01&end_date=2025-06-30")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = get_json(router, "/api/v1/notifications/unread-count").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["unread"].is_number());
}

#[tokio::test]
async fn test_export_sets_attachment_headers() {
    let router = test_router();
    let payload = serde_json::json!({
        "metric": "status_breakdown",
        "format": "csv",
        "start_date": "2025-06-01",
        "end_date": "2025-06-30",
    });
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/exports")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("analytics_export_status_breakdown_"));
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.starts_with("label,count,amount,average_amount,percentage"));
}

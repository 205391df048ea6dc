//! 搜索意图路由

use std::sync::Arc;

use pulse_common::TimeWindow;
use pulse_errors::AppResult;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::application::breakdown::BreakdownAggregator;
use crate::application::kpi::KpiCalculator;
use crate::domain::intents::{match_intent, suggested_keywords, SearchIntent};
use crate::domain::model::{BreakdownDimension, GroupDimension};
use crate::domain::repositories::MetricStore;

/// 路由结果
///
/// 不同意图返回不同结构，统一挂在 `data` 下。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightResponse {
    pub query: String,
    /// 未命中时为 null
    pub matched_insight: Option<String>,
    pub title: String,
    pub description: String,
    pub data: serde_json::Value,
}

/// 搜索意图路由器
pub struct InsightRouter {
    kpis: Arc<KpiCalculator>,
    breakdowns: Arc<BreakdownAggregator>,
    store: Arc<dyn MetricStore>,
}

impl InsightRouter {
    const TOP_USERS_LIMIT: u32 = 10;

    pub fn new(
        kpis: Arc<KpiCalculator>,
        breakdowns: Arc<BreakdownAggregator>,
        store: Arc<dyn MetricStore>,
    ) -> Self {
        Self {
            kpis,
            breakdowns,
            store,
        }
    }

    /// 关键词路由到预置查询；未命中返回确定性的 no-match 负载
    pub async fn route(&self, query_text: &str, window: &TimeWindow) -> AppResult<InsightResponse> {
        let Some(intent) = match_intent(query_text) else {
            debug!(query = query_text, "No insight matched");
            return Ok(Self::no_match(query_text));
        };

        debug!(query = query_text, intent = intent.code(), "Routing search query");
        let data = self.fetch(intent, window).await?;

        Ok(InsightResponse {
            query: query_text.to_string(),
            matched_insight: Some(intent.code().to_string()),
            title: intent.title().to_string(),
            description: intent.description().to_string(),
            data,
        })
    }

    fn no_match(query_text: &str) -> InsightResponse {
        InsightResponse {
            query: query_text.to_string(),
            matched_insight: None,
            title: "No matching insight".to_string(),
            description: "Try one of the suggested keywords".to_string(),
            data: json!({ "suggestions": suggested_keywords() }),
        }
    }

    async fn fetch(&self, intent: SearchIntent, window: &TimeWindow) -> AppResult<serde_json::Value> {
        let value = match intent {
            SearchIntent::FailedSummary => {
                let snapshot = self.kpis.compute(window).await?;
                json!({
                    "failed_transactions": snapshot.failed_transactions,
                    "failed_volume": snapshot.failed_volume,
                    "total_transactions": snapshot.total_transactions,
                })
            }
            SearchIntent::RevenueSummary => {
                let snapshot = self.kpis.compute(window).await?;
                json!({
                    "gross_transaction_value": snapshot.gross_transaction_value,
                    "average_ticket_size": snapshot.average_ticket_size,
                    "total_transactions": snapshot.total_transactions,
                })
            }
            SearchIntent::TopUsers => {
                let rows = self.store.top_n(window, Self::TOP_USERS_LIMIT).await?;
                serde_json::to_value(rows)
                    .map_err(|e| pulse_errors::AppError::internal(e.to_string()))?
            }
            SearchIntent::PaymentBreakdown => {
                let entries = self
                    .breakdowns
                    .breakdown(BreakdownDimension::PaymentMethod, window)
                    .await?;
                serde_json::to_value(entries)
                    .map_err(|e| pulse_errors::AppError::internal(e.to_string()))?
            }
            SearchIntent::StatusOverview => {
                let entries = self
                    .breakdowns
                    .breakdown(BreakdownDimension::Status, window)
                    .await?;
                serde_json::to_value(entries)
                    .map_err(|e| pulse_errors::AppError::internal(e.to_string()))?
            }
            SearchIntent::SuccessRate => {
                let snapshot = self.kpis.compute(window).await?;
                json!({
                    "success_rate": snapshot.success_rate,
                    "total_transactions": snapshot.total_transactions,
                    "failed_transactions": snapshot.failed_transactions,
                })
            }
            SearchIntent::DailyTrend => {
                let rows = self
                    .store
                    .grouped_aggregate(window, GroupDimension::Date)
                    .await?;
                serde_json::to_value(rows)
                    .map_err(|e| pulse_errors::AppError::internal(e.to_string()))?
            }
            SearchIntent::Overview => {
                let snapshot = self.kpis.compute(window).await?;
                serde_json::to_value(snapshot)
                    .map_err(|e| pulse_errors::AppError::internal(e.to_string()))?
            }
        };
        Ok(value)
    }
}

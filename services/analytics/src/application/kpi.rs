//! KPI 计算器

use std::sync::Arc;

use async_trait::async_trait;
use pulse_common::TimeWindow;
use pulse_cqrs_core::{Query, QueryHandler};
use pulse_errors::AppResult;
use tracing::debug;

use crate::domain::model::{KpiSnapshot, TransactionFilter};
use crate::domain::repositories::MetricStore;

/// KPI 查询
#[derive(Debug, Clone)]
pub struct GetKpisQuery {
    pub window: TimeWindow,
}

impl Query for GetKpisQuery {
    type Result = KpiSnapshot;
}

/// KPI 计算器
///
/// 无状态，可跨窗口并发调用。
pub struct KpiCalculator {
    store: Arc<dyn MetricStore>,
}

impl KpiCalculator {
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self { store }
    }

    /// 计算单窗口的 KPI 快照
    ///
    /// 空窗口按各指标的零值策略产出快照；存储不可达时向上返回
    /// DataUnavailable，绝不降级为全零结果。
    pub async fn compute(&self, window: &TimeWindow) -> AppResult<KpiSnapshot> {
        let aggregates = self
            .store
            .aggregate(window, &TransactionFilter::default())
            .await?;
        let total_users = self.store.total_users_as_of(window.end).await?;

        debug!(
            start = %window.start,
            end = %window.end,
            total = aggregates.total_count,
            "Computed raw aggregates"
        );

        Ok(KpiSnapshot::derive(total_users, &aggregates))
    }
}

#[async_trait]
impl QueryHandler<GetKpisQuery> for KpiCalculator {
    async fn handle(&self, query: GetKpisQuery) -> AppResult<KpiSnapshot> {
        self.compute(&query.window).await
    }
}

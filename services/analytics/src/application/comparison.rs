//! 环比比较器

use std::sync::Arc;

use async_trait::async_trait;
use pulse_common::TimeWindow;
use pulse_cqrs_core::{Query, QueryHandler};
use pulse_errors::AppResult;
use tracing::debug;

use crate::application::kpi::KpiCalculator;
use crate::domain::model::{ComparisonResult, KpiDeltas};

/// 环比比较查询
#[derive(Debug, Clone)]
pub struct CompareKpisQuery {
    pub window: TimeWindow,
}

impl Query for CompareKpisQuery {
    type Result = ComparisonResult;
}

/// 环比比较器
///
/// 对当前窗口与紧邻的前一个等长窗口各算一次 KPI，再得出增量。
pub struct PeriodComparator {
    calculator: Arc<KpiCalculator>,
}

impl PeriodComparator {
    pub fn new(calculator: Arc<KpiCalculator>) -> Self {
        Self { calculator }
    }

    pub async fn compare(&self, window: &TimeWindow) -> AppResult<ComparisonResult> {
        let previous_window = window.previous();
        debug_assert!(window.comparable_with(&previous_window));

        let current = self.calculator.compute(window).await?;
        let previous = self.calculator.compute(&previous_window).await?;
        let deltas = KpiDeltas::between(&current, &previous);

        debug!(
            current_period = %window.label(),
            previous_period = %window.previous_label(),
            "Computed period comparison"
        );

        Ok(ComparisonResult {
            current_period: window.label(),
            previous_period: window.previous_label(),
            current,
            previous,
            deltas,
        })
    }
}

#[async_trait]
impl QueryHandler<CompareKpisQuery> for PeriodComparator {
    async fn handle(&self, query: CompareKpisQuery) -> AppResult<ComparisonResult> {
        self.compare(&query.window).await
    }
}

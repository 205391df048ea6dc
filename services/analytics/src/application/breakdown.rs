//! 分组统计聚合器

use std::sync::Arc;

use pulse_common::{round_amount, share_of, TimeWindow};
use pulse_errors::AppResult;
use rust_decimal::Decimal;

use crate::domain::model::{
    BreakdownDimension, BreakdownEntry, GroupDimension, GroupedRow, TransactionFilter,
    TransactionStatus,
};
use crate::domain::repositories::MetricStore;

/// 分组统计聚合器
///
/// 报表端点与搜索路由共用。
pub struct BreakdownAggregator {
    store: Arc<dyn MetricStore>,
}

impl BreakdownAggregator {
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self { store }
    }

    /// 按维度产出分组占比
    ///
    /// 空窗口返回空列表，而非 NaN 百分比的条目。
    pub async fn breakdown(
        &self,
        dimension: BreakdownDimension,
        window: &TimeWindow,
    ) -> AppResult<Vec<BreakdownEntry>> {
        let total = self
            .store
            .aggregate(window, &TransactionFilter::default())
            .await?
            .total_count;
        if total == 0 {
            return Ok(Vec::new());
        }

        let entries = match dimension {
            BreakdownDimension::Status => {
                let mut rows = self.store.grouped_aggregate(window, GroupDimension::Status).await?;
                rows.sort_by(|a, b| b.count.cmp(&a.count));
                to_count_entries(rows, total)
            }
            BreakdownDimension::FunnelStage => {
                let mut rows = self.store.grouped_aggregate(window, GroupDimension::Status).await?;
                rows.sort_by_key(|row| TransactionStatus::funnel_rank(&row.label));
                to_count_entries(rows, total)
            }
            BreakdownDimension::PaymentMethod => {
                let mut rows = self
                    .store
                    .grouped_aggregate(window, GroupDimension::PaymentMethod)
                    .await?;
                rows.sort_by(|a, b| b.sum.cmp(&a.sum));
                rows.into_iter()
                    .map(|row| {
                        let average = if row.count == 0 {
                            Decimal::ZERO
                        } else {
                            round_amount(row.sum / Decimal::from(row.count))
                        };
                        BreakdownEntry {
                            percentage: share_of(row.count, total),
                            amount: Some(row.sum),
                            average_amount: Some(average),
                            label: row.label,
                            count: row.count,
                        }
                    })
                    .collect()
            }
            BreakdownDimension::HourOfDay => {
                let mut rows = self
                    .store
                    .grouped_aggregate(window, GroupDimension::HourOfDay)
                    .await?;
                // 无交易的小时不补零，直接省略
                rows.retain(|row| row.count > 0);
                rows.sort_by_key(|row| row.label.parse::<u8>().unwrap_or(u8::MAX));
                rows.into_iter()
                    .map(|row| BreakdownEntry {
                        percentage: share_of(row.count, total),
                        amount: Some(row.sum),
                        average_amount: None,
                        label: row.label,
                        count: row.count,
                    })
                    .collect()
            }
        };

        Ok(entries)
    }
}

fn to_count_entries(rows: Vec<GroupedRow>, total: i64) -> Vec<BreakdownEntry> {
    rows.into_iter()
        .map(|row| BreakdownEntry {
            percentage: share_of(row.count, total),
            amount: Some(row.sum),
            average_amount: None,
            label: row.label,
            count: row.count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::RawAggregates;
    use crate::domain::repositories::MockMetricStore;
    use chrono::{TimeZone, Utc};

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn status_rows() -> Vec<GroupedRow> {
        vec![
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
            GroupedRow {
                label: "pending".to_string(),
                count: 6,
                sum: Decimal::from(1_200),
            },
        ]
    }

    fn store_with(total: i64, dimension_rows: Vec<GroupedRow>) -> MockMetricStore {
        let mut store = MockMetricStore::new();
        store.expect_aggregate().returning(move |_, _| {
            Ok(RawAggregates {
                total_count: total,
                ..Default::default()
            })
        });
        store
            .expect_grouped_aggregate()
            .returning(move |_, _| Ok(dimension_rows.clone()));
        store
    }

    #[tokio::test]
    async fn test_funnel_uses_fixed_stage_order() {
        let aggregator = BreakdownAggregator::new(Arc::new(store_with(132, status_rows())));
        let entries = aggregator
            .breakdown(BreakdownDimension::FunnelStage, &window())
            .await
            .unwrap();

        let labels: Vec<_> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["pending", "success", "failed"]);
        assert_eq!(entries[0].percentage, Decimal::new(455, 2));
        assert_eq!(entries[1].percentage, Decimal::new(8636, 2));
        assert_eq!(entries[2].percentage, Decimal::new(833, 2));
    }

    #[tokio::test]
    async fn test_status_breakdown_percentages_sum_to_total() {
        let rows = vec![
            GroupedRow {
                label: "success".to_string(),
                count: 80,
                sum: Decimal::from(8_000),
            },
            GroupedRow {
                label: "failed".to_string(),
                count: 20,
                sum: Decimal::from(2_000),
            },
        ];
        let aggregator = BreakdownAggregator::new(Arc::new(store_with(100, rows)));
        let entries = aggregator
            .breakdown(BreakdownDimension::Status, &window())
            .await
            .unwrap();

        let sum: Decimal = entries.iter().map(|e| e.percentage).sum();
        assert!((sum - Decimal::ONE_HUNDRED).abs() <= Decimal::new(1, 1));
    }

    #[tokio::test]
    async fn test_payment_method_sorted_by_amount_with_average() {
        let rows = vec![
            GroupedRow {
                label: "bank_transfer".to_string(),
                count: 10,
                sum: Decimal::from(1_000),
            },
            GroupedRow {
                label: "card".to_string(),
                count: 40,
                sum: Decimal::from(9_000),
            },
        ];
        let aggregator = BreakdownAggregator::new(Arc::new(store_with(50, rows)));
        let entries = aggregator
            .breakdown(BreakdownDimension::PaymentMethod, &window())
            .await
            .unwrap();

        assert_eq!(entries[0].label, "card");
        assert_eq!(entries[0].average_amount, Some(Decimal::from(225)));
        assert_eq!(entries[1].label, "bank_transfer");
        assert_eq!(entries[1].average_amount, Some(Decimal::from(100)));
    }

    #[tokio::test]
    async fn test_hour_breakdown_omits_empty_hours_and_sorts() {
        let rows = vec![
            GroupedRow {
                label: "14".to_string(),
                count: 30,
                sum: Decimal::from(3_000),
            },
            GroupedRow {
                label: "9".to_string(),
                count: 70,
                sum: Decimal::from(7_000),
            },
            GroupedRow {
                label: "3".to_string(),
                count: 0,
                sum: Decimal::ZERO,
            },
        ];
        let aggregator = BreakdownAggregator::new(Arc::new(store_with(100, rows)));
        let entries = aggregator
            .breakdown(BreakdownDimension::HourOfDay, &window())
            .await
            .unwrap();

        let labels: Vec<_> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["9", "14"]);
    }

    #[tokio::test]
    async fn test_empty_window_returns_empty_list() {
        let aggregator = BreakdownAggregator::new(Arc::new(store_with(0, Vec::new())));
        let entries = aggregator
            .breakdown(BreakdownDimension::Status, &window())
            .await
            .unwrap();
        assert!(entries.is_empty());
    }
}

//! 报表导出

use std::sync::Arc;

use chrono::Utc;
use pulse_common::TimeWindow;
use pulse_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::application::breakdown::BreakdownAggregator;
use crate::application::kpi::KpiCalculator;
use crate::domain::model::{BreakdownDimension, GroupDimension};
use crate::domain::repositories::MetricStore;

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }
}

/// 可导出的报表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportMetric {
    Overview,
    StatusBreakdown,
    PaymentMethodBreakdown,
    HourlyBreakdown,
    Funnel,
    DailyTrend,
    TopUsers,
}

impl ExportMetric {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::StatusBreakdown => "status_breakdown",
            Self::PaymentMethodBreakdown => "payment_method_breakdown",
            Self::HourlyBreakdown => "hourly_breakdown",
            Self::Funnel => "funnel",
            Self::DailyTrend => "daily_trend",
            Self::TopUsers => "top_users",
        }
    }
}

/// 渲染完成的导出文件
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

/// 导出服务
///
/// 行数据来自分组聚合与 KPI 计算，这里只负责渲染。
pub struct ExportService {
    kpis: Arc<KpiCalculator>,
    breakdowns: Arc<BreakdownAggregator>,
    store: Arc<dyn MetricStore>,
}

impl ExportService {
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

    pub async fn export(
        &self,
        metric: ExportMetric,
        format: ExportFormat,
        window: &TimeWindow,
    ) -> AppResult<ExportFile> {
        let table = self.collect(metric, window).await?;
        let filename = format!(
            "analytics_export_{}_{}.{}",
            metric.slug(),
            Utc::now().format("%Y-%m-%d"),
            format.extension()
        );
        let body = match format {
            ExportFormat::Csv => render_csv(&table),
            ExportFormat::Json => render_json(metric, window, &table)?,
        };
        info!(
            metric = metric.slug(),
            format = format.extension(),
            rows = table.rows.len(),
            filename = %filename,
            "Report exported"
        );
        Ok(ExportFile {
            filename,
            content_type: format.content_type(),
            body,
        })
    }

    async fn collect(&self, metric: ExportMetric, window: &TimeWindow) -> AppResult<Table> {
        let table = match metric {
            ExportMetric::Overview => {
                let snapshot = self.kpis.compute(window).await?;
                Table {
                    header: vec!["metric", "value"],
                    rows: vec![
                        row2("total_users_cumulative", snapshot.total_users_cumulative),
                        row2("total_transactions", snapshot.total_transactions),
                        row2("new_users_in_window", snapshot.new_users_in_window),
                        row2("pending_transactions", snapshot.pending_transactions),
                        row2("gross_transaction_value", snapshot.gross_transaction_value),
                        row2("success_rate", snapshot.success_rate),
                        row2("average_ticket_size", snapshot.average_ticket_size),
                        row2("failed_transactions", snapshot.failed_transactions),
                        row2("failed_volume", snapshot.failed_volume),
                    ],
                }
            }
            ExportMetric::StatusBreakdown
            | ExportMetric::PaymentMethodBreakdown
            | ExportMetric::HourlyBreakdown
            | ExportMetric::Funnel => {
                let dimension = match metric {
                    ExportMetric::StatusBreakdown => BreakdownDimension::Status,
                    ExportMetric::PaymentMethodBreakdown => BreakdownDimension::PaymentMethod,
                    ExportMetric::HourlyBreakdown => BreakdownDimension::HourOfDay,
                    _ => BreakdownDimension::FunnelStage,
                };
                let entries = self.breakdowns.breakdown(dimension, window).await?;
                Table {
                    header: vec!["label", "count", "amount", "average_amount", "percentage"],
                    rows: entries
                        .into_iter()
                        .map(|e| {
                            vec![
                                e.label,
                                e.count.to_string(),
                                e.amount.map(|v| v.to_string()).unwrap_or_default(),
                                e.average_amount.map(|v| v.to_string()).unwrap_or_default(),
                                e.percentage.to_string(),
                            ]
                        })
                        .collect(),
                }
            }
            ExportMetric::DailyTrend => {
                let rows = self
                    .store
                    .grouped_aggregate(window, GroupDimension::Date)
                    .await?;
                Table {
                    header: vec!["date", "count", "sum"],
                    rows: rows
                        .into_iter()
                        .map(|r| vec![r.label, r.count.to_string(), r.sum.to_string()])
                        .collect(),
                }
            }
            ExportMetric::TopUsers => {
                let rows = self.store.top_n(window, 10).await?;
                Table {
                    header: vec!["user_id", "user_email", "count", "sum"],
                    rows: rows
                        .into_iter()
                        .map(|r| {
                            vec![
                                r.user_id.to_string(),
                                r.user_email,
                                r.count.to_string(),
                                r.sum.to_string(),
                            ]
                        })
                        .collect(),
                }
            }
        };
        Ok(table)
    }
}

struct Table {
    header: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

fn row2(name: &str, value: impl ToString) -> Vec<String> {
    vec![name.to_string(), value.to_string()]
}

fn render_csv(table: &Table) -> String {
    let mut out = String::new();
    out.push_str(&table.header.join(","));
    out.push('\n');
    for row in &table.rows {
        let line: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

// 含逗号、引号或换行的字段加引号，内部引号翻倍
fn csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn render_json(metric: ExportMetric, window: &TimeWindow, table: &Table) -> AppResult<String> {
    let rows: Vec<serde_json::Value> = table
        .rows
        .iter()
        .map(|row| {
            let object: serde_json::Map<String, serde_json::Value> = table
                .header
                .iter()
                .zip(row.iter())
                .map(|(k, v)| (k.to_string(), json!(v)))
                .collect();
            serde_json::Value::Object(object)
        })
        .collect();
    let document = json!({
        "generated_at": Utc::now(),
        "metric": metric.slug(),
        "window": {
            "start": window.start,
            "end": window.end,
        },
        "row_count": rows.len(),
        "rows": rows,
    });
    serde_json::to_string_pretty(&document).map_err(|e| AppError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{GroupedRow, RawAggregates};
    use crate::domain::repositories::MockMetricStore;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn service() -> ExportService {
        let mut store = MockMetricStore::new();
        store.expect_aggregate().returning(|_, _| {
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
        });
        store.expect_total_users_as_of().returning(|_| Ok(1_000));
        store.expect_grouped_aggregate().returning(|_, dim| {
            Ok(match dim {
                GroupDimension::Date => vec![
                    GroupedRow {
                        label: "2025-06-01".to_string(),
                        count: 60,
                        sum: Decimal::from(30_000),
                    },
                    GroupedRow {
                        label: "2025-06-02".to_string(),
                        count: 72,
                        sum: Decimal::from(27_000),
                    },
                ],
                _ => Vec::new(),
            })
        });
        store.expect_top_n().returning(|_, _| Ok(Vec::new()));
        let store: Arc<dyn MetricStore> = Arc::new(store);
        ExportService::new(
            Arc::new(KpiCalculator::new(store.clone())),
            Arc::new(BreakdownAggregator::new(store.clone())),
            store,
        )
    }

    #[tokio::test]
    async fn test_csv_export_has_header_and_filename_pattern() {
        let file = service()
            .export(ExportMetric::DailyTrend, ExportFormat::Csv, &window())
            .await
            .unwrap();

        let mut lines = file.body.lines();
        assert_eq!(lines.next(), Some("date,count,sum"));
        assert_eq!(lines.next(), Some("2025-06-01,60,30000"));
        assert!(file.filename.starts_with("analytics_export_daily_trend_"));
        assert!(file.filename.ends_with(".csv"));
        assert_eq!(file.content_type, "text/csv; charset=utf-8");
    }

    #[tokio::test]
    async fn test_json_export_carries_metadata_wrapper() {
        let file = service()
            .export(ExportMetric::Overview, ExportFormat::Json, &window())
            .await
            .unwrap();

        let document: serde_json::Value = serde_json::from_str(&file.body).unwrap();
        assert_eq!(document["metric"], "overview");
        assert_eq!(document["row_count"], 9);
        assert!(document["generated_at"].is_string());
        assert_eq!(document["rows"][0]["metric"], "total_users_cumulative");
    }

    #[test]
    fn test_csv_field_escaping() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}

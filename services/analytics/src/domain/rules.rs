//! 告警阈值规则表
//!
//! 静态配置，进程启动时装载一次，运行期只读。

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::model::{ComparisonResult, KpiSnapshot};

/// 告警级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
}

impl ComparisonOperator {
    pub fn compare(&self, value: Decimal, threshold: Decimal) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::GreaterOrEqual => value >= threshold,
            Self::LessThan => value < threshold,
            Self::LessOrEqual => value <= threshold,
        }
    }
}

/// 规则引用的指标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    SuccessRate,
    GrossTransactionValue,
    AverageTicketSize,
    FailedTransactions,
    FailedVolume,
    NewUsers,
    TotalTransactions,
    PendingTransactions,
}

/// 规则取值方式：当期值或环比增量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Current,
    Delta,
}

/// 阈值规则
#[derive(Debug, Clone)]
pub struct ThresholdRule {
    /// 通知去重依据
    pub notification_type: &'static str,
    pub metric: MetricKey,
    pub value_kind: ValueKind,
    pub operator: ComparisonOperator,
    pub threshold: Decimal,
    pub severity: Severity,
    /// 同类型通知的最小间隔
    pub cooldown: Duration,
    pub title: &'static str,
}

impl ThresholdRule {
    /// 从比较结果中取出规则关注的数值
    ///
    /// 增量规则在基期为零（增量无定义）时返回 None，视为未触发。
    pub fn select_value(&self, comparison: &ComparisonResult) -> Option<Decimal> {
        match self.value_kind {
            ValueKind::Current => Some(metric_current(&comparison.current, self.metric)),
            ValueKind::Delta => metric_delta(comparison, self.metric),
        }
    }
}

fn metric_current(snapshot: &KpiSnapshot, metric: MetricKey) -> Decimal {
    match metric {
        MetricKey::SuccessRate => snapshot.success_rate,
        MetricKey::GrossTransactionValue => snapshot.gross_transaction_value,
        MetricKey::AverageTicketSize => snapshot.average_ticket_size,
        MetricKey::FailedTransactions => Decimal::from(snapshot.failed_transactions),
        MetricKey::FailedVolume => snapshot.failed_volume,
        MetricKey::NewUsers => Decimal::from(snapshot.new_users_in_window),
        MetricKey::TotalTransactions => Decimal::from(snapshot.total_transactions),
        MetricKey::PendingTransactions => Decimal::from(snapshot.pending_transactions),
    }
}

fn metric_delta(comparison: &ComparisonResult, metric: MetricKey) -> Option<Decimal> {
    let deltas = &comparison.deltas;
    match metric {
        MetricKey::SuccessRate => deltas.success_rate_points,
        MetricKey::GrossTransactionValue => deltas.gross_transaction_value,
        MetricKey::AverageTicketSize => deltas.average_ticket_size,
        MetricKey::FailedTransactions => deltas.failed_transactions,
        MetricKey::FailedVolume => deltas.failed_volume,
        MetricKey::NewUsers => deltas.new_users_in_window,
        MetricKey::TotalTransactions => deltas.total_transactions,
        MetricKey::PendingTransactions => deltas.pending_transactions,
    }
}

/// 默认规则表
pub fn default_rules() -> Vec<ThresholdRule> {
    vec![
        ThresholdRule {
            notification_type: "success_rate_drop",
            metric: MetricKey::SuccessRate,
            value_kind: ValueKind::Delta,
            operator: ComparisonOperator::LessOrEqual,
            threshold: Decimal::from(-5),
            severity: Severity::Warning,
            cooldown: Duration::hours(6),
            title: "Success rate dropped",
        },
        ThresholdRule {
            notification_type: "success_rate_low",
            metric: MetricKey::SuccessRate,
            value_kind: ValueKind::Current,
            operator: ComparisonOperator::LessThan,
            threshold: Decimal::from(70),
            severity: Severity::Critical,
            cooldown: Duration::hours(6),
            title: "Success rate below floor",
        },
        ThresholdRule {
            notification_type: "failed_spike",
            metric: MetricKey::FailedTransactions,
            value_kind: ValueKind::Delta,
            operator: ComparisonOperator::GreaterOrEqual,
            threshold: Decimal::from(50),
            severity: Severity::Critical,
            cooldown: Duration::hours(6),
            title: "Failed transactions spiked",
        },
        ThresholdRule {
            notification_type: "gtv_drop",
            metric: MetricKey::GrossTransactionValue,
            value_kind: ValueKind::Delta,
            operator: ComparisonOperator::LessOrEqual,
            threshold: Decimal::from(-20),
            severity: Severity::Warning,
            cooldown: Duration::hours(24),
            title: "GTV dropped versus previous period",
        },
        ThresholdRule {
            notification_type: "new_users_drop",
            metric: MetricKey::NewUsers,
            value_kind: ValueKind::Delta,
            operator: ComparisonOperator::LessOrEqual,
            threshold: Decimal::from(-30),
            severity: Severity::Info,
            cooldown: Duration::hours(24),
            title: "New user signups dropped",
        },
        ThresholdRule {
            notification_type: "pending_backlog",
            metric: MetricKey::PendingTransactions,
            value_kind: ValueKind::Current,
            operator: ComparisonOperator::GreaterOrEqual,
            threshold: Decimal::from(100),
            severity: Severity::Warning,
            cooldown: Duration::hours(12),
            title: "Pending transaction backlog",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{KpiDeltas, RawAggregates};

    fn comparison(current: KpiSnapshot, previous: KpiSnapshot) -> ComparisonResult {
        let deltas = KpiDeltas::between(&current, &previous);
        ComparisonResult {
            current_period: "Last 7 days".to_string(),
            previous_period: "Previous 7 days".to_string(),
            current,
            previous,
            deltas,
        }
    }

    #[test]
    fn test_operator_compare() {
        let op = ComparisonOperator::LessOrEqual;
        assert!(op.compare(Decimal::from(-6), Decimal::from(-5)));
        assert!(op.compare(Decimal::from(-5), Decimal::from(-5)));
        assert!(!op.compare(Decimal::from(-4), Decimal::from(-5)));
    }

    #[test]
    fn test_delta_rule_skipped_without_baseline() {
        let previous = KpiSnapshot::derive(0, &RawAggregates::default());
        let current = KpiSnapshot::derive(
            10,
            &RawAggregates {
                total_count: 50,
                failed_count: 50,
                ..Default::default()
            },
        );
        let rule = &default_rules()[2]; // failed_spike
        assert_eq!(rule.select_value(&comparison(current, previous)), None);
    }

    #[test]
    fn test_current_rule_selects_snapshot_value() {
        let aggregates = RawAggregates {
            total_count: 300,
            pending_count: 120,
            success_count: 150,
            failed_count: 30,
            ..Default::default()
        };
        let snapshot = KpiSnapshot::derive(10, &aggregates);
        let comparison = comparison(snapshot.clone(), snapshot);
        let rule = &default_rules()[5]; // pending_backlog
        assert_eq!(rule.select_value(&comparison), Some(Decimal::from(120)));
        assert!(rule
            .operator
            .compare(rule.select_value(&comparison).unwrap(), rule.threshold));
    }

    #[test]
    fn test_rule_types_are_unique() {
        let rules = default_rules();
        let mut types: Vec<_> = rules.iter().map(|r| r.notification_type).collect();
        types.sort_unstable();
        types.dedup();
        assert_eq!(types.len(), rules.len());
    }
}

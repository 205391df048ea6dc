//! 告警通知实体

use chrono::{DateTime, Utc};
use pulse_common::NotificationId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::rules::{Severity, ThresholdRule};

/// 告警通知
///
/// 触发时刻的指标/阈值快照，创建后不再重算；仅 `read` 可被更新。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub notification_type: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub read: bool,
    pub metric_value: Decimal,
    pub threshold_value: Decimal,
    /// 触发所依据的比较周期描述（如 "Last 7 days vs Previous 7 days"）
    pub comparison_period: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// 由触发的规则构建通知
    pub fn from_rule(
        rule: &ThresholdRule,
        metric_value: Decimal,
        comparison_period: impl Into<String>,
    ) -> Self {
        let comparison_period = comparison_period.into();
        Self {
            id: NotificationId::new(),
            notification_type: rule.notification_type.to_string(),
            title: rule.title.to_string(),
            description: format!(
                "{}: observed {} against threshold {} ({})",
                rule.title, metric_value, rule.threshold, comparison_period
            ),
            severity: rule.severity,
            read: false,
            metric_value,
            threshold_value: rule.threshold,
            comparison_period,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::default_rules;

    #[test]
    fn test_notification_snapshots_firing_condition() {
        let rule = &default_rules()[0];
        let notification =
            Notification::from_rule(rule, Decimal::from(-8), "Last 7 days vs Previous 7 days");
        assert_eq!(notification.notification_type, "success_rate_drop");
        assert_eq!(notification.metric_value, Decimal::from(-8));
        assert_eq!(notification.threshold_value, rule.threshold);
        assert_eq!(notification.severity, rule.severity);
        assert!(!notification.read);
        assert!(notification.description.contains("-8"));
    }
}

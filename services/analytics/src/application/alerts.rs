//! 阈值评估与通知生成

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pulse_common::TimeWindow;
use pulse_cqrs_core::{Command, CommandHandler};
use pulse_errors::AppResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::application::comparison::PeriodComparator;
use crate::domain::model::ComparisonResult;
use crate::domain::notification::Notification;
use crate::domain::repositories::NotificationRepository;
use crate::domain::rules::{default_rules, ThresholdRule};

/// 单轮评估统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub evaluated: usize,
    pub fired: usize,
    pub suppressed: usize,
    pub failed: usize,
}

/// 触发一轮阈值评估
#[derive(Debug, Clone)]
pub struct GenerateNotificationsCommand {
    pub window: TimeWindow,
}

impl Command for GenerateNotificationsCommand {
    type Result = EvaluationSummary;
}

/// 阈值评估器
///
/// 每轮复用同一份环比结果，规则之间互不影响。
pub struct ThresholdEvaluator {
    comparator: Arc<PeriodComparator>,
    notifications: Arc<dyn NotificationRepository>,
    rules: Vec<ThresholdRule>,
}

impl ThresholdEvaluator {
    pub fn new(
        comparator: Arc<PeriodComparator>,
        notifications: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self {
            comparator,
            notifications,
            rules: default_rules(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<ThresholdRule>) -> Self {
        self.rules = rules;
        self
    }

    /// 跑完整一轮：取环比，逐条规则评估
    ///
    /// 环比本身失败则整轮失败；单条规则失败只计入 `failed`。
    pub async fn run_cycle(&self, window: &TimeWindow) -> AppResult<EvaluationSummary> {
        let comparison = self.comparator.compare(window).await?;
        let mut summary = EvaluationSummary::default();

        for rule in &self.rules {
            summary.evaluated += 1;
            match self.evaluate_rule(rule, &comparison).await {
                Ok(RuleOutcome::Fired) => summary.fired += 1,
                Ok(RuleOutcome::Suppressed) => summary.suppressed += 1,
                Ok(RuleOutcome::Idle) => {}
                Err(e) => {
                    warn!(
                        rule = rule.notification_type,
                        error = %e,
                        "Threshold rule evaluation failed"
                    );
                    summary.failed += 1;
                }
            }
        }

        metrics::counter!("alerts_fired_total").increment(summary.fired as u64);
        metrics::counter!("alerts_suppressed_total").increment(summary.suppressed as u64);
        info!(
            evaluated = summary.evaluated,
            fired = summary.fired,
            suppressed = summary.suppressed,
            failed = summary.failed,
            "Alert cycle completed"
        );
        Ok(summary)
    }

    async fn evaluate_rule(
        &self,
        rule: &ThresholdRule,
        comparison: &ComparisonResult,
    ) -> AppResult<RuleOutcome> {
        let Some(value) = rule.select_value(comparison) else {
            return Ok(RuleOutcome::Idle);
        };
        if !rule.operator.compare(value, rule.threshold) {
            return Ok(RuleOutcome::Idle);
        }

        let since = Utc::now() - rule.cooldown;
        if self
            .notifications
            .exists_since(rule.notification_type, since)
            .await?
        {
            debug!(rule = rule.notification_type, "Alert suppressed by cooldown");
            return Ok(RuleOutcome::Suppressed);
        }

        let notification = Notification::from_rule(rule, value, &comparison.current_period);
        let id = self.notifications.insert(&notification).await?;
        info!(
            rule = rule.notification_type,
            notification_id = %id,
            value = %value,
            threshold = %rule.threshold,
            "Alert fired"
        );
        Ok(RuleOutcome::Fired)
    }
}

enum RuleOutcome {
    Idle,
    Fired,
    Suppressed,
}

#[async_trait]
impl CommandHandler<GenerateNotificationsCommand> for ThresholdEvaluator {
    async fn handle(&self, command: GenerateNotificationsCommand) -> AppResult<EvaluationSummary> {
        self.run_cycle(&command.window).await
    }
}

//! 告警评估调度

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pulse_common::TimeWindow;
use pulse_config::AlertingConfig;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::application::alerts::ThresholdEvaluator;

/// Graceful shutdown 控制器
#[derive(Clone, Default)]
pub struct ShutdownController {
    notify: Arc<Notify>,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// 触发关闭
    pub fn shutdown(&self) {
        info!("Triggering shutdown");
        self.notify.notify_waiters();
    }

    /// 等待关闭信号
    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}

/// 后台告警循环
///
/// 单个调度器串行评估，去重依赖这一点。
pub fn spawn_alert_loop(
    evaluator: Arc<ThresholdEvaluator>,
    config: AlertingConfig,
    shutdown: ShutdownController,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            info!("Alerting disabled, scheduler not started");
            return;
        }
        let mut ticker = tokio::time::interval(Duration::from_secs(config.tick_interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            interval_secs = config.tick_interval_secs,
            window_days = config.comparison_window_days,
            "Alert scheduler started"
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let window = TimeWindow::last_days(Utc::now(), config.comparison_window_days);
                    match evaluator.run_cycle(&window).await {
                        Ok(summary) => {
                            info!(
                                fired = summary.fired,
                                suppressed = summary.suppressed,
                                failed = summary.failed,
                                "Scheduled alert cycle done"
                            );
                        }
                        Err(e) => error!(error = %e, "Scheduled alert cycle failed"),
                    }
                }
                _ = shutdown.wait() => {
                    info!("Alert scheduler stopped");
                    break;
                }
            }
        }
    })
}

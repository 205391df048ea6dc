//! 共享应用状态

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::application::alerts::ThresholdEvaluator;
use crate::application::breakdown::BreakdownAggregator;
use crate::application::comparison::PeriodComparator;
use crate::application::export::ExportService;
use crate::application::insight::InsightRouter;
use crate::application::kpi::KpiCalculator;
use crate::domain::repositories::{MetricStore, NotificationRepository};

/// 所有 handler 共享的状态，Clone 只复制 Arc
#[derive(Clone)]
pub struct AppState {
    pub kpis: Arc<KpiCalculator>,
    pub comparator: Arc<PeriodComparator>,
    pub breakdowns: Arc<BreakdownAggregator>,
    pub insights: Arc<InsightRouter>,
    pub exports: Arc<ExportService>,
    pub evaluator: Arc<ThresholdEvaluator>,
    pub store: Arc<dyn MetricStore>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub prometheus: PrometheusHandle,
}

impl AppState {
    pub fn new(
        store: Arc<dyn MetricStore>,
        notifications: Arc<dyn NotificationRepository>,
        prometheus: PrometheusHandle,
    ) -> Self {
        let kpis = Arc::new(KpiCalculator::new(store.clone()));
        let comparator = Arc::new(PeriodComparator::new(kpis.clone()));
        let breakdowns = Arc::new(BreakdownAggregator::new(store.clone()));
        let insights = Arc::new(InsightRouter::new(
            kpis.clone(),
            breakdowns.clone(),
            store.clone(),
        ));
        let exports = Arc::new(ExportService::new(
            kpis.clone(),
            breakdowns.clone(),
            store.clone(),
        ));
        let evaluator = Arc::new(ThresholdEvaluator::new(
            comparator.clone(),
            notifications.clone(),
        ));
        Self {
            kpis,
            comparator,
            breakdowns,
            insights,
            exports,
            evaluator,
            store,
            notifications,
            prometheus,
        }
    }
}

//! 搜索意图表
//!
//! 固定枚举 + 关键词表。匹配按声明顺序、大小写不敏感的子串命中，
//! 首个命中即返回，不做相关度排序。

use serde::{Deserialize, Serialize};

/// 支持的分析意图
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchIntent {
    FailedSummary,
    RevenueSummary,
    TopUsers,
    PaymentBreakdown,
    StatusOverview,
    SuccessRate,
    DailyTrend,
    Overview,
}

impl SearchIntent {
    /// 声明顺序即匹配优先级
    pub const ALL: [SearchIntent; 8] = [
        Self::FailedSummary,
        Self::RevenueSummary,
        Self::TopUsers,
        Self::PaymentBreakdown,
        Self::StatusOverview,
        Self::SuccessRate,
        Self::DailyTrend,
        Self::Overview,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::FailedSummary => "FAILED_SUMMARY",
            Self::RevenueSummary => "REVENUE_SUMMARY",
            Self::TopUsers => "TOP_USERS",
            Self::PaymentBreakdown => "PAYMENT_BREAKDOWN",
            Self::StatusOverview => "STATUS_OVERVIEW",
            Self::SuccessRate => "SUCCESS_RATE",
            Self::DailyTrend => "DAILY_TREND",
            Self::Overview => "OVERVIEW",
        }
    }

    /// 触发关键词（有序）
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::FailedSummary => &["failed", "failure", "declined", "error"],
            Self::RevenueSummary => &["revenue", "gtv", "gross", "income", "volume"],
            Self::TopUsers => &["top user", "top customer", "biggest", "highest spender"],
            Self::PaymentBreakdown => &["payment method", "method", "channel", "card", "wallet"],
            Self::StatusOverview => &["status", "pending"],
            Self::SuccessRate => &["success rate", "conversion", "success"],
            Self::DailyTrend => &["trend", "daily", "per day", "history"],
            Self::Overview => &["overview", "summary", "dashboard", "kpi"],
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::FailedSummary => "Failed Transactions",
            Self::RevenueSummary => "Revenue Summary",
            Self::TopUsers => "Top Users",
            Self::PaymentBreakdown => "Payment Method Breakdown",
            Self::StatusOverview => "Status Overview",
            Self::SuccessRate => "Success Rate",
            Self::DailyTrend => "Daily Trend",
            Self::Overview => "Business Overview",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::FailedSummary => "Count and volume of failed transactions in the period",
            Self::RevenueSummary => "Gross transaction value and ticket size for the period",
            Self::TopUsers => "Highest-spending users in the period",
            Self::PaymentBreakdown => "Transaction share per payment method",
            Self::StatusOverview => "Transaction counts grouped by status",
            Self::SuccessRate => "Share of transactions that completed successfully",
            Self::DailyTrend => "Daily transaction counts and volume",
            Self::Overview => "All core KPIs for the period",
        }
    }
}

/// 按声明顺序做首个命中匹配；无命中返回 None
pub fn match_intent(query: &str) -> Option<SearchIntent> {
    let normalized = query.to_lowercase();
    SearchIntent::ALL.into_iter().find(|intent| {
        intent
            .keywords()
            .iter()
            .any(|keyword| normalized.contains(keyword))
    })
}

/// 未命中时给出的建议关键词（每个意图的首个关键词）
pub fn suggested_keywords() -> Vec<&'static str> {
    SearchIntent::ALL
        .iter()
        .map(|intent| intent.keywords()[0])
        .collect()
}

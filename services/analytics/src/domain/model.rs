//! 交易与指标值对象

use chrono::{DateTime, NaiveDate, Utc};
use pulse_common::{round_amount, round_percent, share_of, UserId};
use pulse_errors::{AppError, AppResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 交易状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// 漏斗阶段的固定排序：pending → success → failed，其余标签排在最后
    pub fn funnel_rank(label: &str) -> u8 {
        match label {
            "pending" => 0,
            "success" => 1,
            "failed" => 2,
            _ => u8::MAX,
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(format!("Unknown transaction status: {}", other)),
        }
    }
}

/// 交易类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Payment,
    Refund,
    Payout,
    Fee,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Refund => "refund",
            Self::Payout => "payout",
            Self::Fee => "fee",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment" => Ok(Self::Payment),
            "refund" => Ok(Self::Refund),
            "payout" => Ok(Self::Payout),
            "fee" => Ok(Self::Fee),
            other => Err(format!("Unknown transaction type: {}", other)),
        }
    }
}

/// 单个窗口的原始聚合事实
///
/// 每次查询即时产出，不落库。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAggregates {
    pub total_count: i64,
    pub pending_count: i64,
    pub success_count: i64,
    pub failed_count: i64,
    /// 成功支付类交易的金额合计（GTV 的来源）
    pub successful_payment_sum: Decimal,
    pub successful_payment_count: i64,
    /// 失败交易的金额合计
    pub failed_sum: Decimal,
    /// 窗口内新增用户数
    pub new_users: i64,
}

/// 单个窗口的 9 项核心业务指标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSnapshot {
    /// 截至窗口结束的累计用户数（非窗口内）
    pub total_users_cumulative: i64,
    pub total_transactions: i64,
    pub new_users_in_window: i64,
    pub pending_transactions: i64,
    /// GTV：成功支付类交易的金额合计
    pub gross_transaction_value: Decimal,
    /// 成功率（百分比，两位小数）
    pub success_rate: Decimal,
    pub average_ticket_size: Decimal,
    pub failed_transactions: i64,
    pub failed_volume: Decimal,
}

impl KpiSnapshot {
    /// 由原始聚合事实推导指标
    ///
    /// 空窗口不报错：成功率与客单价在分母为零时按策略取 0。
    pub fn derive(total_users_cumulative: i64, aggregates: &RawAggregates) -> Self {
        let success_rate = share_of(aggregates.success_count, aggregates.total_count);
        let average_ticket_size = if aggregates.successful_payment_count == 0 {
            Decimal::ZERO
        } else {
            round_amount(
                aggregates.successful_payment_sum
                    / Decimal::from(aggregates.successful_payment_count),
            )
        };

        Self {
            total_users_cumulative,
            total_transactions: aggregates.total_count,
            new_users_in_window: aggregates.new_users,
            pending_transactions: aggregates.pending_count,
            gross_transaction_value: aggregates.successful_payment_sum,
            success_rate,
            average_ticket_size,
            failed_transactions: aggregates.failed_count,
            failed_volume: aggregates.failed_sum,
        }
    }
}

/// 环比增量。基期为零的指标无定义，序列化为 null。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiDeltas {
    pub total_users_cumulative: Option<Decimal>,
    pub total_transactions: Option<Decimal>,
    pub new_users_in_window: Option<Decimal>,
    pub pending_transactions: Option<Decimal>,
    pub gross_transaction_value: Option<Decimal>,
    /// 成功率增量按百分点差值（非变化率）
    pub success_rate_points: Option<Decimal>,
    pub average_ticket_size: Option<Decimal>,
    pub failed_transactions: Option<Decimal>,
    pub failed_volume: Option<Decimal>,
}

impl KpiDeltas {
    pub fn between(current: &KpiSnapshot, previous: &KpiSnapshot) -> Self {
        use pulse_common::{percent_change, percent_change_i64};

        let success_rate_points = if previous.success_rate.is_zero() {
            None
        } else {
            Some(round_percent(current.success_rate - previous.success_rate))
        };

        Self {
            total_users_cumulative: percent_change_i64(
                current.total_users_cumulative,
                previous.total_users_cumulative,
            ),
            total_transactions: percent_change_i64(
                current.total_transactions,
                previous.total_transactions,
            ),
            new_users_in_window: percent_change_i64(
                current.new_users_in_window,
                previous.new_users_in_window,
            ),
            pending_transactions: percent_change_i64(
                current.pending_transactions,
                previous.pending_transactions,
            ),
            gross_transaction_value: percent_change(
                current.gross_transaction_value,
                previous.gross_transaction_value,
            ),
            success_rate_points,
            average_ticket_size: percent_change(
                current.average_ticket_size,
                previous.average_ticket_size,
            ),
            failed_transactions: percent_change_i64(
                current.failed_transactions,
                previous.failed_transactions,
            ),
            failed_volume: percent_change(current.failed_volume, previous.failed_volume),
        }
    }
}

/// 环比比较结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub current_period: String,
    pub previous_period: String,
    pub current: KpiSnapshot,
    pub previous: KpiSnapshot,
    pub deltas: KpiDeltas,
}

/// 分组统计条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub label: String,
    pub count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_amount: Option<Decimal>,
    /// 占窗口总量的百分比（两位小数）
    pub percentage: Decimal,
}

/// 对外报表的分组维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownDimension {
    Status,
    PaymentMethod,
    HourOfDay,
    FunnelStage,
}

/// 存储层的分组维度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupDimension {
    Status,
    PaymentMethod,
    HourOfDay,
    Date,
    TransactionType,
}

/// 存储层返回的分组行：标签 / 计数 / 金额合计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedRow {
    pub label: String,
    pub count: i64,
    pub sum: Decimal,
}

/// Top-N 用户行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopEntityRow {
    pub user_id: UserId,
    pub user_email: String,
    pub count: i64,
    pub sum: Decimal,
}

/// 每日计数（用户活跃报表）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

/// 交易明细行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub user_email: String,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub transaction_type: TransactionType,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}

/// 交易筛选条件
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub status: Option<TransactionStatus>,
    pub transaction_type: Option<TransactionType>,
    pub payment_method: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub email_contains: Option<String>,
}

impl TransactionFilter {
    /// 先于任何查询执行的快速失败校验
    pub fn validate(&self) -> AppResult<()> {
        if let (Some(min), Some(max)) = (self.min_amount, self.max_amount) {
            if min > max {
                return Err(AppError::invalid_parameter(format!(
                    "min_amount {} exceeds max_amount {}",
                    min, max
                )));
            }
        }
        Ok(())
    }
}

/// 交易表排序字段白名单
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSortField {
    CreatedAt,
    Amount,
    Status,
}

impl TransactionSortField {
    pub fn as_column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Amount => "amount",
            Self::Status => "status",
        }
    }
}

impl Default for TransactionSortField {
    fn default() -> Self {
        Self::CreatedAt
    }
}

//! 百分比与舍入策略
//!
//! 所有对外百分比统一保留两位小数，四舍五入（midpoint away from zero）。

use rust_decimal::{Decimal, RoundingStrategy};

/// 百分比小数位数
pub const PERCENT_SCALE: u32 = 2;

/// 按统一策略舍入到两位小数
pub fn round_percent(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PERCENT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// 金额保留两位小数，同一舍入策略
pub fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// 计数占比（百分比）。`total == 0` 时返回 0。
pub fn share_of(part: i64, total: i64) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    round_percent(Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(total))
}

/// 环比变化率（百分比）。前值为 0 时无定义，返回 None。
pub fn percent_change(current: Decimal, previous: Decimal) -> Option<Decimal> {
    if previous.is_zero() {
        return None;
    }
    Some(round_percent(
        (current - previous) / previous * Decimal::ONE_HUNDRED,
    ))
}

/// 整数指标的环比变化率
pub fn percent_change_i64(current: i64, previous: i64) -> Option<Decimal> {
    percent_change(Decimal::from(current), Decimal::from(previous))
}

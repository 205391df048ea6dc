//! 时间窗口值对象

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 时间窗口错误
#[derive(Debug, thiserror::Error)]
pub enum TimeWindowError {
    #[error("End of window precedes start: {start} > {end}")]
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// 时间窗口值对象
///
/// 聚合查询统一使用左闭右开区间 `[start, end)`。按日期构造时，
/// 结束日期按整天计入（`end` 为结束日期次日零点），因此相邻窗口
/// 严格不重叠。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// 创建新的时间窗口，要求 start <= end
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TimeWindowError> {
        if start > end {
            return Err(TimeWindowError::EndBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    /// 从起止日期（含两端）创建窗口
    pub fn from_dates(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, TimeWindowError> {
        let start = start_date.and_hms_opt(0, 0, 0).expect("midnight is valid").and_utc();
        let end_exclusive = end_date
            .checked_add_days(Days::new(1))
            .unwrap_or(end_date)
            .and_hms_opt(0, 0, 0)
            .expect("midnight is valid")
            .and_utc();
        if start_date > end_date {
            return Err(TimeWindowError::EndBeforeStart {
                start,
                end: end_exclusive,
            });
        }
        Ok(Self {
            start,
            end: end_exclusive,
        })
    }

    /// 截至 `end`（不含）的最近 `days` 天窗口，`days` 不足 1 天按 1 天处理
    pub fn last_days(end: DateTime<Utc>, days: i64) -> Self {
        let days = days.max(1);
        Self {
            start: end - chrono::Duration::days(days),
            end,
        }
    }

    /// 窗口长度
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }

    /// 窗口长度（整天数，向下取整）
    pub fn duration_days(&self) -> i64 {
        self.duration().num_days()
    }

    /// 紧邻的前一个等长窗口 `[start - len, start)`
    pub fn previous(&self) -> Self {
        let len = self.duration();
        Self {
            start: self.start - len,
            end: self.start,
        }
    }

    /// 两个窗口是否可比（等长）
    pub fn comparable_with(&self, other: &Self) -> bool {
        self.duration() == other.duration()
    }

    /// 人类可读的窗口描述，如 "Last 30 days"
    pub fn label(&self) -> String {
        format!("Last {} days", self.duration_days().max(1))
    }

    /// 前一窗口的人类可读描述，如 "Previous 30 days"
    pub fn previous_label(&self) -> String {
        format!("Previous {} days", self.duration_days().max(1))
    }
}

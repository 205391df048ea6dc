//! 请求与响应 DTO

use chrono::NaiveDate;
use pulse_common::{Pagination, SortDirection, TimeWindow};
use pulse_errors::{AppError, AppResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::export::{ExportFormat, ExportMetric};
use crate::domain::model::{
    TransactionFilter, TransactionSortField, TransactionStatus, TransactionType,
};

/// 日期范围查询参数，两端日期均含当天
#[derive(Debug, Clone, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRangeQuery {
    pub fn to_window(&self) -> AppResult<TimeWindow> {
        TimeWindow::from_dates(self.start_date, self.end_date)
            .map_err(|e| AppError::invalid_range(e.to_string()))
    }
}

/// 交易明细表查询参数
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionTableQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: Option<TransactionStatus>,
    pub transaction_type: Option<TransactionType>,
    pub payment_method: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub email_contains: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_field: Option<TransactionSortField>,
    pub sort_direction: Option<SortDirection>,
}

impl TransactionTableQuery {
    pub fn to_window(&self) -> AppResult<TimeWindow> {
        TimeWindow::from_dates(self.start_date, self.end_date)
            .map_err(|e| AppError::invalid_range(e.to_string()))
    }

    pub fn filter(&self) -> TransactionFilter {
        TransactionFilter {
            status: self.status,
            transaction_type: self.transaction_type,
            payment_method: self.payment_method.clone(),
            min_amount: self.min_amount,
            max_amount: self.max_amount,
            email_contains: self.email_contains.clone(),
        }
    }

    pub fn pagination(&self) -> Pagination {
        let defaults = Pagination::default();
        Pagination::new(
            self.page.unwrap_or(defaults.page),
            self.page_size.unwrap_or(defaults.page_size),
        )
    }

    pub fn sort_field(&self) -> TransactionSortField {
        self.sort_field.unwrap_or_default()
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction.unwrap_or_default()
    }
}

/// 自由文本搜索参数
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SearchQuery {
    pub fn to_window(&self) -> AppResult<TimeWindow> {
        TimeWindow::from_dates(self.start_date, self.end_date)
            .map_err(|e| AppError::invalid_range(e.to_string()))
    }
}

/// 导出请求
#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequest {
    pub metric: ExportMetric,
    pub format: ExportFormat,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ExportRequest {
    pub fn to_window(&self) -> AppResult<TimeWindow> {
        TimeWindow::from_dates(self.start_date, self.end_date)
            .map_err(|e| AppError::invalid_range(e.to_string()))
    }
}

/// Top 用户查询参数
#[derive(Debug, Clone, Deserialize)]
pub struct TopUsersQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub limit: Option<u32>,
}

impl TopUsersQuery {
    pub const MAX_LIMIT: u32 = 100;
    const DEFAULT_LIMIT: u32 = 10;

    pub fn to_window(&self) -> AppResult<TimeWindow> {
        TimeWindow::from_dates(self.start_date, self.end_date)
            .map_err(|e| AppError::invalid_range(e.to_string()))
    }

    pub fn limit(&self) -> AppResult<u32> {
        let limit = self.limit.unwrap_or(Self::DEFAULT_LIMIT);
        if limit == 0 || limit > Self::MAX_LIMIT {
            return Err(AppError::invalid_parameter(format!(
                "limit must be between 1 and {}",
                Self::MAX_LIMIT
            )));
        }
        Ok(limit)
    }
}

/// 通知列表查询参数
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationListQuery {
    pub limit: Option<u32>,
}

/// mark-read / mark-all-read 结果
#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: u64,
}

/// 通知路径参数
#[derive(Debug, Deserialize)]
pub struct NotificationPath {
    pub id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversed_dates_rejected_as_invalid_range() {
        let query = DateRangeQuery {
            start_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        };
        assert!(matches!(
            query.to_window(),
            Err(AppError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_single_day_range_spans_whole_day() {
        let query = DateRangeQuery {
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        };
        let window = query.to_window().unwrap();
        assert_eq!(window.duration_days(), 1);
    }

    #[test]
    fn test_top_users_limit_bounds() {
        let base = TopUsersQuery {
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            limit: None,
        };
        assert_eq!(base.limit().unwrap(), 10);
        let oversized = TopUsersQuery {
            limit: Some(101),
            ..base
        };
        assert!(oversized.limit().is_err());
    }
}

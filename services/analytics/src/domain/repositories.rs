//! Repository trait 定义
//!
//! 聚合查询与通知存储的抽象接口，持久化技术由 infrastructure 层决定。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_common::{NotificationId, Page, Pagination, SortDirection, TimeWindow};
use pulse_errors::AppResult;

use crate::domain::model::{
    DailyCount, GroupDimension, GroupedRow, RawAggregates, TopEntityRow, TransactionFilter,
    TransactionRecord, TransactionSortField,
};
use crate::domain::notification::Notification;

/// 指标存储：窗口化聚合查询
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// 单窗口原始聚合事实
    async fn aggregate(
        &self,
        window: &TimeWindow,
        filter: &TransactionFilter,
    ) -> AppResult<RawAggregates>;

    /// 按维度分组聚合
    async fn grouped_aggregate(
        &self,
        window: &TimeWindow,
        dimension: GroupDimension,
    ) -> AppResult<Vec<GroupedRow>>;

    /// 窗口内消费额 Top-N 用户
    async fn top_n(&self, window: &TimeWindow, n: u32) -> AppResult<Vec<TopEntityRow>>;

    /// 截至某时刻的累计用户数
    async fn total_users_as_of(&self, instant: DateTime<Utc>) -> AppResult<i64>;

    /// 窗口内每日新增用户
    async fn new_users_by_day(&self, window: &TimeWindow) -> AppResult<Vec<DailyCount>>;

    /// 交易明细分页查询
    async fn list_transactions(
        &self,
        window: &TimeWindow,
        filter: &TransactionFilter,
        pagination: &Pagination,
        sort_field: TransactionSortField,
        sort_direction: SortDirection,
    ) -> AppResult<Page<TransactionRecord>>;
}

/// 通知存储
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// 自 `since` 起是否已存在同类型通知（冷却期去重依据）
    async fn exists_since(&self, notification_type: &str, since: DateTime<Utc>)
        -> AppResult<bool>;

    async fn insert(&self, notification: &Notification) -> AppResult<NotificationId>;

    /// 标记已读；id 不存在返回 false
    async fn mark_read(&self, id: NotificationId) -> AppResult<bool>;

    async fn mark_all_read(&self) -> AppResult<u64>;

    async fn list_recent(&self, limit: u32) -> AppResult<Vec<Notification>>;

    async fn count_unread(&self) -> AppResult<i64>;
}

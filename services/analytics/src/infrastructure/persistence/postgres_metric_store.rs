//! PostgreSQL MetricStore 实现
//!
//! 所有聚合都下推到 SQL，服务层只拿聚合事实。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use pulse_common::{Page, Pagination, SortDirection, TimeWindow, UserId};
use pulse_errors::{AppError, AppResult};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::model::{
    DailyCount, GroupDimension, GroupedRow, RawAggregates, TopEntityRow, TransactionFilter,
    TransactionRecord, TransactionSortField,
};
use crate::domain::repositories::MetricStore;

pub struct PostgresMetricStore {
    pool: PgPool,
}

impl PostgresMetricStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AggregateRow {
    total_count: i64,
    pending_count: i64,
    success_count: i64,
    failed_count: i64,
    successful_payment_sum: Decimal,
    successful_payment_count: i64,
    failed_sum: Decimal,
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    label: String,
    count: i64,
    sum: Decimal,
}

#[derive(sqlx::FromRow)]
struct TopUserRow {
    user_id: Uuid,
    user_email: String,
    count: i64,
    sum: Decimal,
}

#[derive(sqlx::FromRow)]
struct DailyCountRow {
    date: NaiveDate,
    count: i64,
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    user_email: String,
    amount: Decimal,
    status: String,
    transaction_type: String,
    payment_method: String,
    created_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_record(self) -> AppResult<TransactionRecord> {
        Ok(TransactionRecord {
            id: self.id,
            user_email: self.user_email,
            amount: self.amount,
            status: self.status.parse().map_err(AppError::database)?,
            transaction_type: self.transaction_type.parse().map_err(AppError::database)?,
            payment_method: self.payment_method,
            created_at: self.created_at,
        })
    }
}

// 筛选子句在列表与计数查询之间共用
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &TransactionFilter) {
    if let Some(status) = filter.status {
        builder.push(" AND t.status = ");
        builder.push_bind(status.as_str());
    }
    if let Some(tx_type) = filter.transaction_type {
        builder.push(" AND t.transaction_type = ");
        builder.push_bind(tx_type.as_str());
    }
    if let Some(method) = &filter.payment_method {
        builder.push(" AND t.payment_method = ");
        builder.push_bind(method.clone());
    }
    if let Some(min) = filter.min_amount {
        builder.push(" AND t.amount >= ");
        builder.push_bind(min);
    }
    if let Some(max) = filter.max_amount {
        builder.push(" AND t.amount <= ");
        builder.push_bind(max);
    }
    if let Some(fragment) = &filter.email_contains {
        builder.push(" AND u.email ILIKE ");
        builder.push_bind(format!("%{}%", fragment));
    }
}

fn window_clause(builder: &mut QueryBuilder<'_, Postgres>, window: &TimeWindow) {
    builder.push(" WHERE t.created_at >= ");
    builder.push_bind(window.start);
    builder.push(" AND t.created_at < ");
    builder.push_bind(window.end);
}

impl GroupDimension {
    // GROUP BY 的标签表达式，全部为常量
    fn label_expr(&self) -> &'static str {
        match self {
            Self::Status => "t.status",
            Self::PaymentMethod => "t.payment_method",
            Self::HourOfDay => "EXTRACT(HOUR FROM t.created_at)::INT::TEXT",
            Self::Date => "TO_CHAR(t.created_at, 'YYYY-MM-DD')",
            Self::TransactionType => "t.transaction_type",
        }
    }
}

#[async_trait]
impl MetricStore for PostgresMetricStore {
    async fn aggregate(
        &self,
        window: &TimeWindow,
        filter: &TransactionFilter,
    ) -> AppResult<RawAggregates> {
        let mut builder = QueryBuilder::new(
            r#"
            SELECT COUNT(*) AS total_count,
                   COUNT(*) FILTER (WHERE t.status = 'pending') AS pending_count,
                   COUNT(*) FILTER (WHERE t.status = 'success') AS success_count,
                   COUNT(*) FILTER (WHERE t.status = 'failed') AS failed_count,
                   COALESCE(SUM(t.amount) FILTER (
                       WHERE t.status = 'success' AND t.transaction_type = 'payment'
                   ), 0) AS successful_payment_sum,
                   COUNT(*) FILTER (
                       WHERE t.status = 'success' AND t.transaction_type = 'payment'
                   ) AS successful_payment_count,
                   COALESCE(SUM(t.amount) FILTER (WHERE t.status = 'failed'), 0) AS failed_sum
            FROM transactions t
            JOIN users u ON u.id = t.user_id
            "#,
        );
        window_clause(&mut builder, window);
        push_filter(&mut builder, filter);

        let row: AggregateRow = builder
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to aggregate transactions: {}", e)))?;

        let new_users: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE created_at >= $1 AND created_at < $2",
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to count new users: {}", e)))?;

        Ok(RawAggregates {
            total_count: row.total_count,
            pending_count: row.pending_count,
            success_count: row.success_count,
            failed_count: row.failed_count,
            successful_payment_sum: row.successful_payment_sum,
            successful_payment_count: row.successful_payment_count,
            failed_sum: row.failed_sum,
            new_users: new_users.0,
        })
    }

    async fn grouped_aggregate(
        &self,
        window: &TimeWindow,
        dimension: GroupDimension,
    ) -> AppResult<Vec<GroupedRow>> {
        let sql = format!(
            r#"
            SELECT {label} AS label,
                   COUNT(*) AS count,
                   COALESCE(SUM(t.amount), 0) AS sum
            FROM transactions t
            WHERE t.created_at >= $1 AND t.created_at < $2
            GROUP BY 1
            ORDER BY 1
            "#,
            label = dimension.label_expr()
        );

        let rows: Vec<GroupRow> = sqlx::query_as(&sql)
            .bind(window.start)
            .bind(window.end)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to group transactions: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|r| GroupedRow {
                label: r.label,
                count: r.count,
                sum: r.sum,
            })
            .collect())
    }

    async fn top_n(&self, window: &TimeWindow, n: u32) -> AppResult<Vec<TopEntityRow>> {
        let rows: Vec<TopUserRow> = sqlx::query_as(
            r#"
            SELECT t.user_id,
                   u.email AS user_email,
                   COUNT(*) AS count,
                   COALESCE(SUM(t.amount), 0) AS sum
            FROM transactions t
            JOIN users u ON u.id = t.user_id
            WHERE t.created_at >= $1 AND t.created_at < $2
              AND t.status = 'success' AND t.transaction_type = 'payment'
            GROUP BY t.user_id, u.email
            ORDER BY sum DESC
            LIMIT $3
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .bind(n as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to rank users: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|r| TopEntityRow {
                user_id: UserId::from_uuid(r.user_id),
                user_email: r.user_email,
                count: r.count,
                sum: r.sum,
            })
            .collect())
    }

    async fn total_users_as_of(&self, instant: DateTime<Utc>) -> AppResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE created_at < $1")
            .bind(instant)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count users: {}", e)))?;
        Ok(row.0)
    }

    async fn new_users_by_day(&self, window: &TimeWindow) -> AppResult<Vec<DailyCount>> {
        let rows: Vec<DailyCountRow> = sqlx::query_as(
            r#"
            SELECT created_at::DATE AS date, COUNT(*) AS count
            FROM users
            WHERE created_at >= $1 AND created_at < $2
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to count new users by day: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|r| DailyCount {
                date: r.date,
                count: r.count,
            })
            .collect())
    }

    async fn list_transactions(
        &self,
        window: &TimeWindow,
        filter: &TransactionFilter,
        pagination: &Pagination,
        sort_field: TransactionSortField,
        sort_direction: SortDirection,
    ) -> AppResult<Page<TransactionRecord>> {
        filter.validate()?;
        pagination
            .validate()
            .map_err(AppError::invalid_parameter)?;

        let mut count_builder = QueryBuilder::new(
            "SELECT COUNT(*) FROM transactions t JOIN users u ON u.id = t.user_id",
        );
        window_clause(&mut count_builder, window);
        push_filter(&mut count_builder, filter);

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count transactions: {}", e)))?;

        let mut builder = QueryBuilder::new(
            r#"
            SELECT t.id, u.email AS user_email, t.amount, t.status,
                   t.transaction_type, t.payment_method, t.created_at
            FROM transactions t
            JOIN users u ON u.id = t.user_id
            "#,
        );
        window_clause(&mut builder, window);
        push_filter(&mut builder, filter);
        // 排序列来自白名单枚举，不拼接用户输入
        builder.push(format!(
            " ORDER BY t.{} {}",
            sort_field.as_column(),
            sort_direction.as_sql()
        ));
        builder.push(" LIMIT ");
        builder.push_bind(pagination.limit());
        builder.push(" OFFSET ");
        builder.push_bind(pagination.offset());

        let rows: Vec<TransactionRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list transactions: {}", e)))?;

        let items = rows
            .into_iter()
            .map(TransactionRow::into_record)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Page {
            items,
            total,
            page: pagination.page,
            page_size: pagination.page_size,
        })
    }
}

//! PostgreSQL Repository 实现

pub mod postgres_metric_store;
pub mod postgres_notification_repository;

pub use postgres_metric_store::PostgresMetricStore;
pub use postgres_notification_repository::PostgresNotificationRepository;

//! Pulse Analytics Service Library
//!
//! 分层架构：
//! - `domain`: 值对象、阈值规则、搜索意图、仓储 trait
//! - `application`: KPI 计算、环比、阈值评估、意图路由、分组占比、导出
//! - `infrastructure`: PostgreSQL 仓储实现
//! - `api`: axum HTTP 层
//! - `scheduler`: 后台告警循环与关闭控制

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod scheduler;

//! pulse-errors - 统一错误处理
//!
//! 基于 RFC 7807 Problem Details 规范

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid_range(msg: impl Into<String>) -> Self {
        Self::InvalidRange(msg.into())
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn data_unavailable(msg: impl Into<String>) -> Self {
        Self::DataUnavailable(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// 转换为 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRange(_) => 400,
            Self::InvalidParameter(_) => 400,
            Self::NotFound(_) => 404,
            Self::DataUnavailable(_) => 503,
            Self::Database(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// 转换为 Problem Details
    pub fn to_problem_details(&self) -> ProblemDetails {
        ProblemDetails {
            r#type: self.problem_type(),
            title: self.problem_title(),
            status: self.status_code(),
            detail: self.to_string(),
            instance: None,
        }
    }

    fn problem_type(&self) -> String {
        match self {
            Self::InvalidRange(_) => "https://api.pulse-pay.io/problems/invalid-range".to_string(),
            Self::InvalidParameter(_) => {
                "https://api.pulse-pay.io/problems/invalid-parameter".to_string()
            }
            Self::NotFound(_) => "https://api.pulse-pay.io/problems/not-found".to_string(),
            Self::DataUnavailable(_) => {
                "https://api.pulse-pay.io/problems/data-unavailable".to_string()
            }
            Self::Database(_) => "https://api.pulse-pay.io/problems/database".to_string(),
            Self::Internal(_) => "https://api.pulse-pay.io/problems/internal".to_string(),
        }
    }

    fn problem_title(&self) -> String {
        match self {
            Self::InvalidRange(_) => "Invalid Date Range".to_string(),
            Self::InvalidParameter(_) => "Invalid Parameter".to_string(),
            Self::NotFound(_) => "Resource Not Found".to_string(),
            Self::DataUnavailable(_) => "Data Unavailable".to_string(),
            Self::Database(_) => "Database Error".to_string(),
            Self::Internal(_) => "Internal Server Error".to_string(),
        }
    }
}

/// RFC 7807 Problem Details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_map_to_400() {
        assert_eq!(AppError::invalid_range("end before start").status_code(), 400);
        assert_eq!(AppError::invalid_parameter("page = 0").status_code(), 400);
    }

    #[test]
    fn test_data_unavailable_maps_to_503() {
        assert_eq!(AppError::data_unavailable("store timeout").status_code(), 503);
    }

    #[test]
    fn test_problem_details_carry_detail() {
        let problem = AppError::not_found("notification abc").to_problem_details();
        assert_eq!(problem.status, 404);
        assert_eq!(problem.title, "Resource Not Found");
        assert!(problem.detail.contains("notification abc"));
    }
}

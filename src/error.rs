//! 错误类型定义

use std::io;

/// 核心错误分类
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// 目标别名不存在
    #[error("host not found: {0}")]
    NotFound(String),

    /// 别名已存在且要求唯一
    #[error("host already exists: {0}")]
    Conflict(String),

    /// 别名无法表示为合法的 Host pattern
    #[error("invalid ssh config format: {0}")]
    Format(String),

    /// 文件或账本读写失败
    #[error(transparent)]
    Io(#[from] io::Error),

    /// 其余数据库错误
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// 把唯一约束冲突归类为 Conflict，其余归类为 Storage
    pub(crate) fn conflict_or_storage(err: sqlx::Error, alias: &str) -> SyncError {
        use sqlx::error::DatabaseError;

        if let sqlx::Error::Database(ref db) = err {
            if db.kind() == sqlx::error::ErrorKind::UniqueViolation {
                return SyncError::Conflict(alias.to_string());
            }
        }
        SyncError::Storage(err)
    }

    pub(crate) fn is_conflict(&self) -> bool {
        matches!(self, SyncError::Conflict(_))
    }
}

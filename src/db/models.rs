//! 主机数据模型

use serde::{Deserialize, Serialize};

/// 主机记录
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    /// 唯一别名，对应 ssh config 的 Host 条目
    pub alias: String,
    /// 创建时间（Unix 毫秒时间戳），首次入库后不再变化
    pub created_at: i64,
    /// 最近修改时间
    pub updated_at: Option<i64>,
    /// 最近连接时间
    pub last_connection: Option<i64>,
    /// 备注，可多行
    pub notes: String,
    /// 标签
    pub tags: Vec<String>,
    /// 配置项，保持文件内顺序
    pub options: Vec<HostOption>,
}

impl Host {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
            ..Default::default()
        }
    }

    /// 追加一个配置项
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let opt = HostOption {
            id: 0,
            host: self.alias.clone(),
            key: key.into(),
            value: value.into(),
        };
        self.options.push(opt);
        self
    }
}

/// 单条配置项
///
/// 调和时以 (host, key, value) 三元组为身份，`id` 只是行号。
/// IdentityFile、LocalForward 这类指令允许同一 key 下多个 value。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostOption {
    /// 数据库行号，未入库时为 0
    pub id: i64,
    /// 所属主机别名
    pub host: String,
    pub key: String,
    pub value: String,
}

// 数据库表模型
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HostRow {
    pub host: String,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub last_connection: Option<i64>,
    pub notes: String,
    pub tags: String,
}

impl From<HostRow> for Host {
    fn from(row: HostRow) -> Self {
        Host {
            alias: row.host,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_connection: row.last_connection,
            notes: row.notes,
            tags: split_tags(&row.tags),
            options: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HostOptionRow {
    pub id: i64,
    pub host: String,
    pub key: String,
    pub value: String,
}

impl From<HostOptionRow> for HostOption {
    fn from(row: HostOptionRow) -> Self {
        HostOption {
            id: row.id,
            host: row.host,
            key: row.key,
            value: row.value,
        }
    }
}

/// 标签以逗号拼接存入单列
pub(crate) fn join_tags(tags: &[String]) -> String {
    tags.join(",")
}

pub(crate) fn split_tags(joined: &str) -> Vec<String> {
    if joined.is_empty() {
        return Vec::new();
    }
    joined.split(',').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        let tags = vec!["prod".to_string(), "db".to_string()];
        assert_eq!(split_tags(&join_tags(&tags)), tags);
        assert!(split_tags("").is_empty());
    }
}

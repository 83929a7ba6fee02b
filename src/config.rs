//! 应用配置模块

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// 导入时的冲突解决策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// 任何别名冲突都使整次导入失败回滚
    AlwaysError,
    /// 已存在的别名保留数据库侧定义，只导入新别名
    #[default]
    Ignore,
    /// 配置文件的定义覆盖数据库侧
    FavorConfig,
}

impl std::fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictPolicy::AlwaysError => write!(f, "always_error"),
            ConflictPolicy::Ignore => write!(f, "ignore"),
            ConflictPolicy::FavorConfig => write!(f, "favor_config"),
        }
    }
}

impl From<&str> for ConflictPolicy {
    fn from(s: &str) -> Self {
        match s {
            "always_error" => ConflictPolicy::AlwaysError,
            "ignore" => ConflictPolicy::Ignore,
            "favor_config" => ConflictPolicy::FavorConfig,
            // 未配置或无法识别时回退到 ignore
            _ => ConflictPolicy::Ignore,
        }
    }
}

/// 同步配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    /// 冲突解决策略
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    /// 导入或修改成功后是否回写 ssh config 文件
    #[serde(default = "default_write_through")]
    pub write_through: bool,
    /// ssh config 文件路径（未设置时由调用方提供）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_config_path: Option<String>,
    /// 数据库文件路径（未设置时使用默认配置目录）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
}

fn default_write_through() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::default(),
            write_through: default_write_through(),
            ssh_config_path: None,
            storage_path: None,
        }
    }
}

impl SyncSettings {
    /// 从配置文件加载同步配置
    pub fn load(config_dir: &Path) -> Self {
        let config_file = config_dir.join("config.json");
        if config_file.exists() {
            if let Ok(content) = fs::read_to_string(&config_file) {
                if let Ok(config) = serde_json::from_str::<serde_json::Value>(&content) {
                    if let Some(sync_config) = config.get("sync") {
                        if let Ok(sync) = serde_json::from_value::<SyncSettings>(sync_config.clone()) {
                            return sync;
                        }
                    }
                }
            }
        }
        Self::default()
    }

    /// 保存同步配置
    pub fn save(&self, config_dir: &Path) -> io::Result<()> {
        let config_file = config_dir.join("config.json");

        // 读取现有配置
        let mut config: serde_json::Value = if config_file.exists() {
            let content = fs::read_to_string(&config_file)?;
            serde_json::from_str(&content).unwrap_or_else(|_| serde_json::json!({}))
        } else {
            serde_json::json!({})
        };

        // 更新同步配置
        config["sync"] = serde_json::to_value(self).unwrap();

        // 写入文件
        let content = serde_json::to_string_pretty(&config).unwrap();
        fs::write(&config_file, content)?;

        Ok(())
    }
}

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod logging;
pub mod sshconf;

pub use config::{ConflictPolicy, SyncSettings};
pub use core::{ChecksumLedger, SyncEngine, SyncReport};
pub use db::models::{Host, HostOption};
pub use db::HostDao;
pub use error::{Result, SyncError};

/// 应用状态，构造一次后显式传给所有调用方
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub settings: SyncSettings,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        // 获取默认应用配置目录
        let config_dir = dirs::config_dir()
            .map(|p| p.join("sshsync"))
            .unwrap_or_else(|| PathBuf::from(".sshsync"));
        std::fs::create_dir_all(&config_dir)?;

        // 校验和账本放在数据目录下
        let data_dir = dirs::data_dir()
            .map(|p| p.join("sshsync"))
            .unwrap_or_else(|| PathBuf::from(".sshsync"));
        std::fs::create_dir_all(data_dir.join("checksums"))?;

        let settings = SyncSettings::load(&config_dir);

        // 初始化数据库
        let db_path = settings
            .storage_path
            .clone()
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir.join("sshsync.db"));
        // SQLite 连接字符串格式: sqlite://path 或 sqlite:path
        // Windows 路径需要转换反斜杠为正斜杠
        let db_path_str = db_path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid database path"))?
            .replace('\\', "/");

        // 单写入者模型，一个连接即可，避免并发写冲突
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&format!("sqlite:{}?mode=rwc", db_path_str))
            .await?;

        // 运行数据库迁移
        sqlx::migrate!("./migrations").run(&db).await?;

        Ok(Self {
            db: Arc::new(db),
            config_dir,
            data_dir,
            settings,
        })
    }

    /// 构造主机 DAO
    pub fn dao(&self) -> HostDao {
        HostDao::new(self.db.clone())
    }

    /// 依据当前配置构造同步引擎
    pub fn engine(&self) -> SyncEngine {
        let ledger = ChecksumLedger::new(self.data_dir.join("checksums"));
        SyncEngine::new(self.dao(), ledger, self.settings.conflict_policy)
            .with_write_through(self.settings.write_through)
    }

    /// 清理资源（应用关闭时调用）
    pub async fn cleanup(&self) {
        tracing::debug!("关闭数据库连接池...");
        self.db.close().await;
    }
}

// 平台相关的应用目录
pub mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
        } else {
            // Linux
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
        }
    }

    pub fn data_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
        } else {
            // Linux
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local").join("share"))
                })
        }
    }
}

//! 同步引擎
//!
//! 以冲突策略为准，在数据库与 ssh config 文件之间执行
//! 校验和门控的导入与回写。

use crate::config::ConflictPolicy;
use crate::core::checksum::ChecksumLedger;
use crate::db::models::Host;
use crate::db::HostDao;
use crate::error::Result;
use crate::sshconf;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// 单次同步的结果汇总
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub file: String,
    pub policy: ConflictPolicy,
    /// 文件自上次同步以来没有变化，本次被跳过
    pub skipped: bool,
    /// 从文件解析出的可导入主机数
    pub hosts_parsed: u32,
    pub start_time: i64,
    pub end_time: i64,
}

/// 同步引擎
pub struct SyncEngine {
    dao: HostDao,
    ledger: ChecksumLedger,
    policy: ConflictPolicy,
    write_through: bool,
}

impl SyncEngine {
    pub fn new(dao: HostDao, ledger: ChecksumLedger, policy: ConflictPolicy) -> Self {
        Self {
            dao,
            ledger,
            policy,
            write_through: true,
        }
    }

    /// 是否在导入或修改后回写配置文件
    pub fn with_write_through(mut self, enabled: bool) -> Self {
        self.write_through = enabled;
        self
    }

    /// 同步配置文件到数据库，再以数据库为准回写文件
    ///
    /// 导入成功后才记录校验和，失败的同步在下次调用时从头重试。
    pub async fn sync_file(&self, path: &Path) -> Result<SyncReport> {
        let start_time = chrono::Utc::now().timestamp_millis();
        info!("开始同步配置文件: {:?} (策略 {})", path, self.policy);

        if self.ledger.is_same(path)? {
            info!("配置文件自上次同步后未变化，跳过导入");
            return Ok(SyncReport {
                file: path.display().to_string(),
                policy: self.policy,
                skipped: true,
                hosts_parsed: 0,
                start_time,
                end_time: chrono::Utc::now().timestamp_millis(),
            });
        }

        let hosts = sshconf::read_config(path)?;
        let hosts_parsed = hosts.len() as u32;

        match self.policy {
            ConflictPolicy::AlwaysError => self.dao.insert_many(&hosts).await?,
            ConflictPolicy::Ignore => self.dao.insert_many_ignore_conflict(&hosts).await?,
            ConflictPolicy::FavorConfig => self.dao.insert_or_update_many(&hosts).await?,
        }

        self.ledger.record(path)?;

        if self.write_through {
            self.export(path).await?;
            // 回写后的内容才是下一次比较的基准
            self.ledger.record(path)?;
        }

        info!("同步完成: 解析 {} 个主机", hosts_parsed);
        Ok(SyncReport {
            file: path.display().to_string(),
            policy: self.policy,
            skipped: false,
            hosts_parsed,
            start_time,
            end_time: chrono::Utc::now().timestamp_millis(),
        })
    }

    /// 新增单个主机并以追加方式写入配置文件
    pub async fn add_host(&self, path: &Path, host: &Host) -> Result<()> {
        // 先校验别名，避免入库成功后写文件才失败
        sshconf::validate_alias(&host.alias)?;
        self.dao.insert(host).await?;
        if self.write_through {
            sshconf::append_host(path, host)?;
            self.ledger.record(path)?;
        }
        Ok(())
    }

    /// 删除主机并重写配置文件
    pub async fn remove_host(&self, path: &Path, alias: &str) -> Result<()> {
        self.dao.delete(alias).await?;
        if self.write_through {
            self.export(path).await?;
            self.ledger.record(path)?;
        }
        Ok(())
    }

    /// 将数据库全部主机重写到配置文件（生成 `<file>.old` 备份）
    pub async fn export(&self, path: &Path) -> Result<()> {
        let hosts = self.dao.get_all().await?;
        sshconf::write_hosts(path, &hosts)
    }
}

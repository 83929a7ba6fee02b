//! 主机存储层
//!
//! 所有多语句写入都在单个事务内执行，失败即整体回滚。
//! 连接池不支持多写入者，调用方需自行串行化写操作。

pub mod models;
pub use models::*;

use crate::error::{Result, SyncError};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

const INSERT_HOST_SQL: &str =
    "INSERT INTO hosts (host, created_at, updated_at, last_connection, notes, tags) \
     VALUES (?, ?, ?, ?, ?, ?)";

const INSERT_OPTION_SQL: &str =
    "INSERT OR IGNORE INTO host_options (host, key, value) VALUES (?, ?, ?)";

// updated_at/last_connection 取两侧较大值，created_at 保持首次入库的值。
// SQLite 的 MAX 遇到 NULL 返回 NULL，所以需要 COALESCE 链兜底。
const UPSERT_HOST_SQL: &str = "\
INSERT INTO hosts (host, created_at, updated_at, last_connection, notes, tags)
VALUES (?, ?, ?, ?, ?, ?)
ON CONFLICT(host) DO UPDATE SET
    updated_at = COALESCE(
        MAX(updated_at, excluded.updated_at),
        updated_at,
        excluded.updated_at
    ),
    last_connection = COALESCE(
        MAX(last_connection, excluded.last_connection),
        last_connection,
        excluded.last_connection
    ),
    notes = excluded.notes,
    tags = excluded.tags";

/// 主机 DAO，持有数据库连接池
#[derive(Clone)]
pub struct HostDao {
    db: Arc<SqlitePool>,
}

impl HostDao {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// 插入新主机及其全部配置项，别名已存在时返回 Conflict
    pub async fn insert(&self, host: &Host) -> Result<()> {
        let mut tx = self.db.begin().await?;
        Self::insert_in_tx(&mut tx, host).await?;
        tx.commit().await?;
        Ok(())
    }

    /// 更新已存在的主机，并把配置项调和为给定集合
    pub async fn update(&self, host: &Host) -> Result<()> {
        let mut tx = self.db.begin().await?;
        let res = sqlx::query(
            "UPDATE hosts SET created_at = ?, updated_at = ?, last_connection = ?, \
             notes = ?, tags = ? WHERE host = ?",
        )
        .bind(host.created_at)
        .bind(host.updated_at)
        .bind(host.last_connection)
        .bind(&host.notes)
        .bind(models::join_tags(&host.tags))
        .bind(&host.alias)
        .execute(&mut *tx)
        .await?;
        if res.rows_affected() == 0 {
            return Err(SyncError::NotFound(host.alias.clone()));
        }
        Self::reconcile_options(&mut tx, host).await?;
        tx.commit().await?;
        Ok(())
    }

    /// 插入或合并主机
    ///
    /// 已存在时覆盖 notes/tags，updated_at/last_connection 取两侧较大值，
    /// 配置项调和为给定集合。重复执行同一 upsert 得到同样的最终状态。
    pub async fn upsert(&self, host: &Host) -> Result<()> {
        let mut tx = self.db.begin().await?;
        Self::upsert_in_tx(&mut tx, host).await?;
        tx.commit().await?;
        Ok(())
    }

    /// 批量插入，任何别名冲突使整个事务回滚
    pub async fn insert_many(&self, hosts: &[Host]) -> Result<()> {
        if hosts.is_empty() {
            return Ok(());
        }
        let mut tx = self.db.begin().await?;
        for host in hosts {
            Self::insert_in_tx(&mut tx, host).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// 批量插入，别名冲突的主机连同其配置项被跳过，其余正常提交
    pub async fn insert_many_ignore_conflict(&self, hosts: &[Host]) -> Result<()> {
        if hosts.is_empty() {
            return Ok(());
        }
        let mut tx = self.db.begin().await?;
        for host in hosts {
            let res = Self::insert_host_row(&mut tx, host).await;
            if let Err(err) = res {
                if err.is_conflict() {
                    debug!("跳过已存在的主机: {}", host.alias);
                    continue;
                }
                return Err(err);
            }
            Self::insert_options(&mut tx, &host.alias, &host.options).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// 批量插入或合并，逐主机执行 upsert 语义，整体一个事务
    pub async fn insert_or_update_many(&self, hosts: &[Host]) -> Result<()> {
        if hosts.is_empty() {
            return Ok(());
        }
        let mut tx = self.db.begin().await?;
        for host in hosts {
            Self::upsert_in_tx(&mut tx, host).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// 读取单个主机及其全部配置项
    pub async fn get(&self, alias: &str) -> Result<Host> {
        let row = sqlx::query_as::<_, HostRow>("SELECT * FROM hosts WHERE host = ?")
            .bind(alias)
            .fetch_optional(&*self.db)
            .await?
            .ok_or_else(|| SyncError::NotFound(alias.to_string()))?;

        let mut host: Host = row.into();
        let opts = sqlx::query_as::<_, HostOptionRow>(
            "SELECT * FROM host_options WHERE host = ? ORDER BY id",
        )
        .bind(alias)
        .fetch_all(&*self.db)
        .await?;
        host.options = opts.into_iter().map(Into::into).collect();
        Ok(host)
    }

    /// 读取全部主机
    ///
    /// 两次全表扫描后在内存中按别名拼装，不在 SQL 层做 join。
    pub async fn get_all(&self) -> Result<Vec<Host>> {
        let rows = sqlx::query_as::<_, HostRow>("SELECT * FROM hosts ORDER BY host")
            .fetch_all(&*self.db)
            .await?;
        let mut hosts: Vec<Host> = rows.into_iter().map(Into::into).collect();

        let index: HashMap<String, usize> = hosts
            .iter()
            .enumerate()
            .map(|(i, h)| (h.alias.clone(), i))
            .collect();

        let opts = sqlx::query_as::<_, HostOptionRow>("SELECT * FROM host_options ORDER BY id")
            .fetch_all(&*self.db)
            .await?;
        for opt in opts {
            match index.get(&opt.host) {
                Some(&i) => hosts[i].options.push(opt.into()),
                None => warn!("配置项指向未知主机: {}", opt.host),
            }
        }
        Ok(hosts)
    }

    /// 分页读取主机，拼装方式同 get_all
    pub async fn get_n(&self, limit: u32, offset: u32) -> Result<Vec<Host>> {
        let rows = sqlx::query_as::<_, HostRow>("SELECT * FROM hosts ORDER BY host LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(&*self.db)
            .await?;
        let mut hosts: Vec<Host> = rows.into_iter().map(Into::into).collect();
        if hosts.is_empty() {
            return Ok(hosts);
        }

        // 构建参数占位符
        let placeholders: Vec<&str> = hosts.iter().map(|_| "?").collect();
        let sql = format!(
            "SELECT * FROM host_options WHERE host IN ({}) ORDER BY id",
            placeholders.join(", ")
        );
        let mut query = sqlx::query_as::<_, HostOptionRow>(&sql);
        for host in &hosts {
            query = query.bind(host.alias.clone());
        }
        let opts = query.fetch_all(&*self.db).await?;

        let index: HashMap<String, usize> = hosts
            .iter()
            .enumerate()
            .map(|(i, h)| (h.alias.clone(), i))
            .collect();
        for opt in opts {
            if let Some(&i) = index.get(&opt.host) {
                hosts[i].options.push(opt.into());
            }
        }
        Ok(hosts)
    }

    /// 删除主机，配置项级联删除
    pub async fn delete(&self, alias: &str) -> Result<()> {
        sqlx::query("DELETE FROM hosts WHERE host = ?")
            .bind(alias)
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    /// 仅更新最近连接时间，不触碰配置项
    pub async fn update_last_connection(&self, alias: &str, timestamp: i64) -> Result<()> {
        sqlx::query("UPDATE hosts SET last_connection = ? WHERE host = ?")
            .bind(timestamp)
            .bind(alias)
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    /// 主机总数
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM hosts")
            .fetch_one(&*self.db)
            .await?;
        Ok(count as u64)
    }

    /// 指定主机的配置项数量
    pub async fn count_options(&self, alias: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM host_options WHERE host = ?")
            .bind(alias)
            .fetch_one(&*self.db)
            .await?;
        Ok(count as u64)
    }

    async fn insert_in_tx(tx: &mut Transaction<'_, Sqlite>, host: &Host) -> Result<()> {
        Self::insert_host_row(tx, host).await?;
        Self::insert_options(tx, &host.alias, &host.options).await?;
        Ok(())
    }

    async fn upsert_in_tx(tx: &mut Transaction<'_, Sqlite>, host: &Host) -> Result<()> {
        sqlx::query(UPSERT_HOST_SQL)
            .bind(&host.alias)
            .bind(host.created_at)
            .bind(host.updated_at)
            .bind(host.last_connection)
            .bind(&host.notes)
            .bind(models::join_tags(&host.tags))
            .execute(&mut **tx)
            .await?;
        Self::reconcile_options(tx, host).await?;
        Ok(())
    }

    async fn insert_host_row(tx: &mut Transaction<'_, Sqlite>, host: &Host) -> Result<()> {
        sqlx::query(INSERT_HOST_SQL)
            .bind(&host.alias)
            .bind(host.created_at)
            .bind(host.updated_at)
            .bind(host.last_connection)
            .bind(&host.notes)
            .bind(models::join_tags(&host.tags))
            .execute(&mut **tx)
            .await
            .map_err(|e| SyncError::conflict_or_storage(e, &host.alias))?;
        Ok(())
    }

    async fn insert_options(
        tx: &mut Transaction<'_, Sqlite>,
        alias: &str,
        options: &[HostOption],
    ) -> Result<()> {
        for opt in options {
            sqlx::query(INSERT_OPTION_SQL)
                .bind(alias)
                .bind(&opt.key)
                .bind(&opt.value)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    /// 把存量配置项调和为给定集合
    ///
    /// 先逐条 INSERT OR IGNORE，再用反连接删除不在新集合中的旧行，
    /// 三元组未变化的行保持原有行号不动。空集合等价于全部删除。
    async fn reconcile_options(tx: &mut Transaction<'_, Sqlite>, host: &Host) -> Result<()> {
        Self::insert_options(tx, &host.alias, &host.options).await?;

        if host.options.is_empty() {
            sqlx::query("DELETE FROM host_options WHERE host = ?")
                .bind(&host.alias)
                .execute(&mut **tx)
                .await?;
            return Ok(());
        }

        // 构建参数占位符
        let values: Vec<&str> = host.options.iter().map(|_| "(?, ?, ?)").collect();
        let sql = format!(
            "WITH new_values(host, key, value) AS (VALUES {}) \
             DELETE FROM host_options \
             WHERE host = ? \
               AND NOT EXISTS (\
                   SELECT 1 FROM new_values nv \
                   WHERE nv.host = host_options.host \
                     AND nv.key = host_options.key \
                     AND nv.value = host_options.value)",
            values.join(", ")
        );
        let mut query = sqlx::query(&sql);
        for opt in &host.options {
            query = query.bind(&host.alias).bind(&opt.key).bind(&opt.value);
        }
        query = query.bind(&host.alias);
        query.execute(&mut **tx).await?;
        Ok(())
    }
}

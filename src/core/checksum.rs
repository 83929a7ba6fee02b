//! 配置文件校验和账本
//!
//! 每个被跟踪的配置文件对应账本目录下的一个条目，内容是上次导入时
//! 的原始摘要字节。条目以文件去掉扩展名后的基本名为键，不含目录，
//! 因此两个同名不同目录的文件会共用同一条目（已知局限）。

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 校验和账本
pub struct ChecksumLedger {
    dir: PathBuf,
}

impl ChecksumLedger {
    pub fn new(dir: PathBuf) -> Self {
        // 确保账本目录存在
        let _ = fs::create_dir_all(&dir);
        Self { dir }
    }

    /// 账本条目路径（键为去掉扩展名的文件名）
    fn entry_path(&self, file: &Path) -> PathBuf {
        let stem = file
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        self.dir.join(stem)
    }

    /// 计算文件内容摘要
    fn digest(file: &Path) -> Result<[u8; 32]> {
        let data = fs::read(file)?;
        Ok(*blake3::hash(&data).as_bytes())
    }

    /// 判断文件内容是否与上次记录一致
    ///
    /// 从未记录过的文件视为不一致（需要导入），不算错误。
    pub fn is_same(&self, file: &Path) -> Result<bool> {
        let checksum = Self::digest(file)?;
        let entry = self.entry_path(file);
        match fs::read(&entry) {
            Ok(stored) => Ok(stored == checksum.as_slice()),
            Err(err) => {
                warn!("校验和条目不存在: {:?} ({})", entry, err);
                Ok(false)
            }
        }
    }

    /// 重新计算并覆盖记录文件的校验和
    pub fn record(&self, file: &Path) -> Result<()> {
        let checksum = Self::digest(file)?;
        let entry = self.entry_path(file);
        fs::write(&entry, checksum)?;
        info!("已记录校验和: {:?}", entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unseen_file_is_not_same() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ChecksumLedger::new(dir.path().join("checksums"));

        let file = dir.path().join("config");
        fs::write(&file, "Host a\n").unwrap();
        assert!(!ledger.is_same(&file).unwrap());
    }

    #[test]
    fn test_record_then_same_until_modified() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ChecksumLedger::new(dir.path().join("checksums"));

        let file = dir.path().join("config");
        fs::write(&file, "Host a\n").unwrap();

        ledger.record(&file).unwrap();
        assert!(ledger.is_same(&file).unwrap());

        fs::write(&file, "Host b\n").unwrap();
        assert!(!ledger.is_same(&file).unwrap());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ChecksumLedger::new(dir.path().join("checksums"));

        assert!(ledger.is_same(&dir.path().join("nope")).is_err());
        assert!(ledger.record(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_entry_is_keyed_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ChecksumLedger::new(dir.path().join("checksums"));

        let file = dir.path().join("config.d");
        fs::write(&file, "Host a\n").unwrap();
        ledger.record(&file).unwrap();
        assert!(dir.path().join("checksums").join("config").exists());
    }
}

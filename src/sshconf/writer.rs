//! 把主机记录序列化回 ssh config 文件

use crate::db::models::Host;
use crate::error::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 渲染单个 Host 块
///
/// 备注统一放在所有指令之后，不保留原始注释位置。
fn render_host(host: &Host) -> Result<String> {
    super::validate_alias(&host.alias)?;
    let mut out = String::new();
    out.push_str("Host ");
    out.push_str(&host.alias);
    out.push('\n');
    for opt in &host.options {
        out.push_str(&format!("  {} {}\n", opt.key, opt.value));
    }
    for line in host.notes.lines() {
        out.push_str(&format!("  # {}\n", line));
    }
    out.push('\n');
    Ok(out)
}

/// 追加单个主机块到文件末尾，文件不存在则创建
///
/// 新增单个主机时使用，避免整文件重写。
pub fn append_host(path: &Path, host: &Host) -> Result<()> {
    debug!("追加主机到配置文件: {} -> {:?}", host.alias, path);
    let block = render_host(host)?;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(block.as_bytes())?;
    Ok(())
}

/// 按给定顺序整体重写配置文件
///
/// 所有块先渲染完毕才动文件，任何别名非法都在写入前失败；
/// 原文件存在时先复制一份 `<file>.old` 备份（单代备份，覆盖旧的）。
pub fn write_hosts(path: &Path, hosts: &[Host]) -> Result<()> {
    debug!("重写配置文件: {:?} ({} 个主机)", path, hosts.len());
    let mut rendered = String::new();
    for host in hosts {
        rendered.push_str(&render_host(host)?);
    }

    if path.exists() {
        let mut backup = path.as_os_str().to_os_string();
        backup.push(".old");
        fs::copy(path, PathBuf::from(backup))?;
    }

    fs::write(path, rendered)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sshconf::parser;

    fn sample_host(alias: &str) -> Host {
        let mut host = Host::new(alias)
            .with_option("User", "MyUser")
            .with_option("Port", "2222");
        host.notes = "These should be at the bottom of the host".to_string();
        host
    }

    #[test]
    fn test_append_then_parse() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("new_config");

        append_host(&file, &sample_host("test.local")).unwrap();

        let hosts = parser::read_config(&file).unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].alias, "test.local");
        assert_eq!(hosts[0].options.len(), 2);
        assert_eq!(hosts[0].options[0].key, "User");
        assert_eq!(hosts[0].options[0].value, "MyUser");
        assert_eq!(
            hosts[0].notes,
            "These should be at the bottom of the host"
        );
    }

    #[test]
    fn test_append_keeps_existing_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config");

        append_host(&file, &sample_host("one")).unwrap();
        append_host(&file, &sample_host("two")).unwrap();

        let hosts = parser::read_config(&file).unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].alias, "one");
        assert_eq!(hosts[1].alias, "two");
    }

    #[test]
    fn test_write_hosts_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("dump_config");

        let mut second = sample_host("test2.local");
        second.notes = "These should be at the bottom of host2".to_string();
        write_hosts(&file, &[sample_host("test.local"), second]).unwrap();

        let hosts = parser::read_config(&file).unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].alias, "test.local");
        assert_eq!(hosts[0].options.len(), 2);
        assert_eq!(
            hosts[0].notes,
            "These should be at the bottom of the host"
        );
        assert_eq!(hosts[1].alias, "test2.local");
        assert_eq!(
            hosts[1].notes,
            "These should be at the bottom of host2"
        );
    }

    #[test]
    fn test_write_hosts_makes_backup() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config");
        std::fs::write(&file, "Host old\n  User before\n").unwrap();

        write_hosts(&file, &[sample_host("new.local")]).unwrap();

        let backup = dir.path().join("config.old");
        assert_eq!(
            std::fs::read_to_string(&backup).unwrap(),
            "Host old\n  User before\n"
        );
        let hosts = parser::read_config(&file).unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].alias, "new.local");
    }

    #[test]
    fn test_invalid_alias_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config");
        std::fs::write(&file, "Host keep\n  User kept\n").unwrap();

        let bad = sample_host("two words");
        let err = write_hosts(&file, &[sample_host("fine"), bad]).unwrap_err();
        assert!(matches!(err, crate::error::SyncError::Format(_)));

        // 原文件未被触碰，也没有生成备份
        assert_eq!(
            std::fs::read_to_string(&file).unwrap(),
            "Host keep\n  User kept\n"
        );
        assert!(!dir.path().join("config.old").exists());
    }

    #[test]
    fn test_multiline_notes_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config");

        let mut host = sample_host("test.local");
        host.notes = "line one\nline two".to_string();
        write_hosts(&file, &[host]).unwrap();

        let hosts = parser::read_config(&file).unwrap();
        assert_eq!(hosts[0].notes, "line one\nline two");
    }

    #[test]
    fn test_include_option_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config");

        let host = Host::new("test.local").with_option("Include", "~/.ssh/conf.d/*");
        write_hosts(&file, &[host]).unwrap();

        let hosts = parser::read_config(&file).unwrap();
        assert_eq!(hosts[0].options[0].key, "Include");
        assert_eq!(hosts[0].options[0].value, "~/.ssh/conf.d/*");
    }
}

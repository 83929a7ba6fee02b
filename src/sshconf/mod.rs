//! OpenSSH 客户端配置文件的解析与序列化
//!
//! 只对 Host 和 Include 指令做结构化处理，其余指令一律当作
//! 不透明的 Key/Value 保存。

pub mod parser;
pub mod writer;

pub use parser::read_config;
pub use writer::{append_host, write_hosts};

use crate::error::{Result, SyncError};

/// pattern 含有通配符时不可作为导入别名
pub(crate) fn is_literal_pattern(pattern: &str) -> bool {
    !pattern.is_empty()
        && !pattern
            .chars()
            .any(|c| matches!(c, '*' | '?' | '!' | '[' | ']'))
}

/// 校验别名可以写成合法的 Host pattern
pub(crate) fn validate_alias(alias: &str) -> Result<()> {
    if alias.is_empty() || alias.chars().any(|c| c.is_whitespace() || c == '#') {
        return Err(SyncError::Format(format!("invalid host alias: {:?}", alias)));
    }
    Ok(())
}

//! 解析 ssh config 文本为主机记录

use crate::db::models::{Host, HostOption};
use crate::error::Result;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// 解析中的一个 Host 块
#[derive(Debug, Default)]
struct Block {
    patterns: Vec<String>,
    options: Vec<(String, String)>,
    notes: Vec<String>,
}

/// 读取 ssh config 文件并抽取可导入的主机
///
/// 首个 Host 行之前的指令属于隐式全局块，始终被丢弃；
/// 只含 `*` pattern 的块被跳过；带通配符的 pattern 不导入。
/// 一个块带多个字面 pattern 时按 pattern 拆成多个独立主机，
/// 各自持有配置项与备注的完整拷贝。
pub fn read_config(path: &Path) -> Result<Vec<Host>> {
    debug!("读取 ssh config: {:?}", path);
    let content = fs::read_to_string(path)?;
    Ok(parse(&content))
}

/// 解析配置文本
pub fn parse(content: &str) -> Vec<Host> {
    let mut hosts = Vec::new();
    let mut current: Option<Block> = None;

    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        // 整行注释进入备注
        if let Some(comment) = line.strip_prefix('#') {
            if let Some(block) = current.as_mut() {
                let comment = comment.trim();
                if !comment.is_empty() {
                    block.notes.push(comment.to_string());
                }
            }
            continue;
        }

        let Some((key, rest)) = split_directive(line) else {
            warn!("跳过无法解析的配置行 {}: {:?}", lineno + 1, line);
            continue;
        };

        if key.eq_ignore_ascii_case("host") {
            if let Some(block) = current.take() {
                flush(block, &mut hosts);
            }
            let (patterns, _) = split_inline_comment(rest);
            current = Some(Block {
                patterns: patterns.split_whitespace().map(str::to_string).collect(),
                ..Default::default()
            });
            continue;
        }

        // 首个 Host 之前的指令属于隐式全局块，不保留
        let Some(block) = current.as_mut() else {
            continue;
        };

        if key.eq_ignore_ascii_case("include") {
            // Include 不展开，原样保存剩余部分
            block.options.push(("Include".to_string(), rest.to_string()));
            continue;
        }

        let (value, comment) = split_inline_comment(rest);
        if value.is_empty() {
            warn!("跳过无法解析的配置行 {}: {:?}", lineno + 1, line);
            continue;
        }
        block.options.push((key.to_string(), value.to_string()));
        if let Some(comment) = comment {
            block.notes.push(format!("{}: {}", key, comment));
        }
    }

    if let Some(block) = current.take() {
        flush(block, &mut hosts);
    }
    hosts
}

/// 按空白或 `=` 拆出指令名和剩余部分
fn split_directive(line: &str) -> Option<(&str, &str)> {
    let sep = line.find(|c: char| c.is_whitespace() || c == '=')?;
    let key = &line[..sep];
    let rest = line[sep..].trim_start_matches(|c: char| c.is_whitespace() || c == '=');
    if key.is_empty() || rest.is_empty() {
        return None;
    }
    Some((key, rest))
}

/// 剥离指令值的行尾注释（`Value # comment` 形式）
fn split_inline_comment(rest: &str) -> (&str, Option<&str>) {
    match rest.find(" #") {
        Some(pos) => {
            let value = rest[..pos].trim_end();
            let comment = rest[pos + 2..].trim();
            (value, (!comment.is_empty()).then_some(comment))
        }
        None => (rest.trim_end(), None),
    }
}

/// 把解析完的块展开为主机记录
fn flush(block: Block, hosts: &mut Vec<Host>) {
    if block.patterns.is_empty() {
        return;
    }
    if block.patterns.len() == 1 && block.patterns[0] == "*" {
        return;
    }

    let notes = block.notes.join("\n");
    let now = chrono::Utc::now().timestamp_millis();
    for pattern in block
        .patterns
        .iter()
        .filter(|p| super::is_literal_pattern(p.as_str()))
    {
        let options = block
            .options
            .iter()
            .map(|(key, value)| HostOption {
                id: 0,
                host: pattern.clone(),
                key: key.clone(),
                value: value.clone(),
            })
            .collect();
        hosts.push(Host {
            alias: pattern.clone(),
            created_at: now,
            updated_at: None,
            last_connection: None,
            notes: notes.clone(),
            tags: Vec::new(),
            options,
        });
    }
}

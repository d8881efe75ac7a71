// ==========================================
// 批量导入管道 - 导入配置
// ==========================================
// 职责: 批次大小 / 批间延迟 / 重试 / 端点连接参数
// 层次: 默认值 → JSON 配置文件 → 环境变量覆写
// 红线: 配置只读，导入过程中不修改
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 分批
    pub const BATCH_SIZE: &str = "FSI_BATCH_SIZE";
    pub const BATCH_DELAY_MS: &str = "FSI_BATCH_DELAY_MS";

    // 重试
    pub const MAX_RETRIES: &str = "FSI_MAX_RETRIES";

    // 端点
    pub const ENDPOINT_URL: &str = "FSI_ENDPOINT_URL";
    pub const API_TOKEN: &str = "FSI_API_TOKEN";
    pub const TIMEOUT_SECS: &str = "FSI_TIMEOUT_SECS";
}

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const MAX_BATCH_SIZE: usize = 1000;

const CONFIG_DIR_NAME: &str = "field-service-import";
const CONFIG_FILE_NAME: &str = "config.json";

// ==========================================
// ImportConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub batch_size: usize,            // 每批记录数
    pub inter_batch_delay_ms: u64,    // 批间固定延迟
    pub max_retries: u32,             // 瞬时故障重试次数（0 = 不重试）
    pub retry_backoff_ms: u64,        // 线性退避基数
    pub request_timeout_secs: u64,
    pub endpoint_url: Option<String>,
    pub api_token: Option<String>,
    pub delimiter: Option<char>,      // None = 自动识别
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            inter_batch_delay_ms: 100,
            max_retries: 0,
            retry_backoff_ms: 500,
            request_timeout_secs: 30,
            endpoint_url: None,
            api_token: None,
            delimiter: None,
        }
    }
}

impl ImportConfig {
    /// 默认配置文件位置: <config_dir>/field-service-import/config.json
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// 从 JSON 文件读取，缺省字段取默认值
    pub fn from_json_file(path: &Path) -> ImportResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| ImportError::Config {
            key: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// 完整加载: 显式路径 > 默认路径（存在时）> 默认值，然后叠加环境变量
    pub fn load(path: Option<&Path>) -> ImportResult<Self> {
        let mut config = match path {
            Some(p) => Self::from_json_file(p)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(p) => {
                    debug!(path = %p.display(), "读取默认配置文件");
                    Self::from_json_file(&p)?
                }
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        info!(
            batch_size = config.batch_size,
            max_retries = config.max_retries,
            endpoint = config.endpoint_url.as_deref().unwrap_or("-"),
            "导入配置已加载"
        );
        Ok(config)
    }

    /// 叠加环境变量覆写（读取函数可注入，便于测试）
    pub fn apply_env<F>(&mut self, lookup: F) -> ImportResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(config_keys::BATCH_SIZE) {
            self.batch_size = parse_env(config_keys::BATCH_SIZE, &v)?;
        }
        if let Some(v) = lookup(config_keys::BATCH_DELAY_MS) {
            self.inter_batch_delay_ms = parse_env(config_keys::BATCH_DELAY_MS, &v)?;
        }
        if let Some(v) = lookup(config_keys::MAX_RETRIES) {
            self.max_retries = parse_env(config_keys::MAX_RETRIES, &v)?;
        }
        if let Some(v) = lookup(config_keys::TIMEOUT_SECS) {
            self.request_timeout_secs = parse_env(config_keys::TIMEOUT_SECS, &v)?;
        }
        if let Some(v) = lookup(config_keys::ENDPOINT_URL) {
            self.endpoint_url = Some(v);
        }
        if let Some(v) = lookup(config_keys::API_TOKEN) {
            self.api_token = Some(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> ImportResult<()> {
        if !(1..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            return Err(ImportError::Config {
                key: "batch_size".to_string(),
                message: format!(
                    "必须在 1..={} 之间，实际为 {}",
                    MAX_BATCH_SIZE, self.batch_size
                ),
            });
        }
        Ok(())
    }

    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 分隔符字节（仅 ASCII 有效）
    pub fn delimiter_byte(&self) -> Option<u8> {
        self.delimiter.filter(char::is_ascii).map(|c| c as u8)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> ImportResult<T> {
    value.trim().parse::<T>().map_err(|_| ImportError::Config {
        key: key.to_string(),
        message: format!("无法解析的值: {}", value),
    })
}

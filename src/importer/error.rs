// ==========================================
// 批量导入管道 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 解析错误（致命）/ 批次提交错误（降级为行错误）/ 配置错误
// ==========================================

use crate::i18n::t_with_args;
use thiserror::Error;

/// 文件解析错误（致命，在任何提交之前中止）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("文件格式无效: {0}")]
    FormatInvalid(String),

    #[error("文件无数据行")]
    EmptyFile,
}

/// 批次提交错误（网络/服务端），由编排器降级为逐行错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("网络传输失败: {0}")]
    Transport(String),

    #[error("服务端返回错误 (HTTP {status}): {body}")]
    Server { status: u16, body: String },

    #[error("响应解析失败: {0}")]
    Decode(String),
}

impl SubmissionError {
    /// 是否属于可重试的瞬时故障（传输失败 / 5xx）
    pub fn is_transient(&self) -> bool {
        match self {
            SubmissionError::Transport(_) => true,
            SubmissionError::Server { status, .. } => *status >= 500,
            SubmissionError::Decode(_) => false,
        }
    }
}

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv/.tsv/.txt/.xlsx/.xlsm/.xls/.ods）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    // ===== 映射相关错误 =====
    #[error("未知的来源配置: {0}")]
    UnknownProfile(String),

    #[error("字段 {field} 指定的列不存在: {header}")]
    UnknownHeader { field: String, header: String },

    // ===== 提交相关错误 =====
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    // ===== 配置错误 =====
    #[error("配置值错误 (key: {key}): {message}")]
    Config { key: String, message: String },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::Parse(ParseError::FormatInvalid(err.to_string()))
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::Parse(ParseError::FormatInvalid(err.to_string()))
    }
}

impl ImportError {
    /// 按当前语言生成面向用户的描述
    ///
    /// 文件不存在 / 无数据行走语言文件，其余沿用 Display
    pub fn localized_message(&self, path: &str) -> String {
        match self {
            ImportError::FileNotFound(missing) => {
                t_with_args("import.file_not_found", &[("path", missing)])
            }
            ImportError::Parse(ParseError::EmptyFile) => {
                t_with_args("import.empty_file", &[("path", path)])
            }
            other => other.to_string(),
        }
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

//! 全局错误类型定义
//! 所有错误均可 Clone：同一次规则加载的结果需要原样分发给所有等待方

use rmp_serde::{decode::Error as MsgPackDecodeError, encode::Error as MsgPackEncodeError};
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum MmDetectError {
    // 规则相关错误
    #[error("规则加载失败：{0}")]
    RuleLoadError(String),
    #[error("规则解析失败：{0}")]
    RuleParseError(String),
    #[error("规则快照读写失败：{0}")]
    RuleCacheError(String),

    // 编译相关错误
    #[error("规则编译失败：pattern={pattern}，原因：{reason}")]
    RuleCompileError { pattern: String, reason: String },

    // 检测相关错误
    #[error("规则集不可用：{0}")]
    RulesUnavailable(String),
    #[error("规则加载重试次数已用尽（已失败{attempts}次）：{last_error}")]
    RetryExhausted { attempts: u32, last_error: String },
    #[error("检测器未初始化")]
    DetectorNotInitialized,

    // 基础错误
    #[error("无效输入：{0}")]
    InvalidInput(String),
}

// IO / 序列化错误不可 Clone，统一折叠为带上下文的字符串
impl From<IoError> for MmDetectError {
    fn from(e: IoError) -> Self {
        MmDetectError::RuleLoadError(format!("IO操作失败：{}", e))
    }
}

impl From<SerdeJsonError> for MmDetectError {
    fn from(e: SerdeJsonError) -> Self {
        MmDetectError::RuleParseError(format!("JSON解析失败：{}", e))
    }
}

impl From<MsgPackDecodeError> for MmDetectError {
    fn from(e: MsgPackDecodeError) -> Self {
        MmDetectError::RuleCacheError(format!("MessagePack反序列化失败：{}", e))
    }
}

impl From<MsgPackEncodeError> for MmDetectError {
    fn from(e: MsgPackEncodeError) -> Self {
        MmDetectError::RuleCacheError(format!("MessagePack序列化失败：{}", e))
    }
}

#[cfg(feature = "remote-loader")]
impl From<reqwest::Error> for MmDetectError {
    fn from(e: reqwest::Error) -> Self {
        MmDetectError::RuleLoadError(format!("网络请求失败：{}", e))
    }
}

// 全局Result类型
pub type MmResult<T> = Result<T, MmDetectError>;

//! 规则加载器
//! 只负责“交付一份规则定义”，与传输方式无关（本地文件 / 远程 / 内存桩）

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use tracing::debug;

use super::model::RuleDefinition;
use crate::error::MmResult;
#[cfg(feature = "remote-loader")]
use crate::error::MmDetectError;

/// 规则加载器特质
#[async_trait]
pub trait RuleLoader: Send + Sync {
    /// 拉取一份规则定义
    async fn load(&self) -> MmResult<RuleDefinition>;

    /// 加载器名称（用于日志输出）
    fn name(&self) -> &str;
}

/// 空加载器：返回空规则定义，不视为错误
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRuleLoader;

#[async_trait]
impl RuleLoader for NoopRuleLoader {
    async fn load(&self) -> MmResult<RuleDefinition> {
        Ok(RuleDefinition::default())
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// 内存规则加载器
#[derive(Debug, Clone)]
pub struct StaticRuleLoader {
    definition: RuleDefinition,
}

impl StaticRuleLoader {
    pub fn new(definition: RuleDefinition) -> Self {
        Self { definition }
    }
}

#[async_trait]
impl RuleLoader for StaticRuleLoader {
    async fn load(&self) -> MmResult<RuleDefinition> {
        Ok(self.definition.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// 本地 JSON 规则文件加载器
#[derive(Debug, Clone)]
pub struct FileRuleLoader {
    path: PathBuf,
}

impl FileRuleLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 解析 JSON 规则定义
    pub fn parse(content: &[u8]) -> MmResult<RuleDefinition> {
        Ok(serde_json::from_slice(content)?)
    }
}

#[async_trait]
impl RuleLoader for FileRuleLoader {
    async fn load(&self) -> MmResult<RuleDefinition> {
        let content = tokio::fs::read(&self.path).await?;
        let definition = Self::parse(&content)?;
        debug!(
            "Loaded rule file {}: legacy={}, standard={}",
            self.path.display(),
            definition.legacy_rules.len(),
            definition.standard_rules.len()
        );
        Ok(definition)
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// 远程 JSON 规则加载器
#[cfg(feature = "remote-loader")]
#[derive(Debug, Clone)]
pub struct RemoteRuleLoader {
    url: url::Url,
    client: reqwest::Client,
}

#[cfg(feature = "remote-loader")]
impl RemoteRuleLoader {
    pub fn new(url: &str, timeout: std::time::Duration) -> MmResult<Self> {
        let url = url::Url::parse(url)
            .map_err(|e| MmDetectError::InvalidInput(format!("无效规则URL：{}，错误：{}", url, e)))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { url, client })
    }

    pub fn url(&self) -> &url::Url {
        &self.url
    }
}

#[cfg(feature = "remote-loader")]
#[async_trait]
impl RuleLoader for RemoteRuleLoader {
    async fn load(&self) -> MmResult<RuleDefinition> {
        debug!("Fetching remote rule definition from {}", self.url);
        let response = self
            .client
            .get(self.url.clone())
            .header("User-Agent", concat!("rsmmdetect/", env!("CARGO_PKG_VERSION")))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MmDetectError::RuleLoadError(format!(
                "URL {} 返回状态码 {}",
                self.url,
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        FileRuleLoader::parse(&bytes)
    }

    fn name(&self) -> &str {
        "remote"
    }
}

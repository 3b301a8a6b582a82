//! 规则快照管理
//! 仅处理规则定义的本地序列化（MessagePack）和反序列化

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use rmp_serde::{from_slice, Serializer};
use serde::Serialize;
use tracing::{debug, warn};

use super::loader::RuleLoader;
use super::model::RuleDefinition;
use crate::error::MmResult;

/// 规则快照管理器
pub struct RuleSnapshotManager;

impl RuleSnapshotManager {
    /// 从本地快照加载规则定义
    pub async fn load_snapshot(path: &Path) -> MmResult<RuleDefinition> {
        let data = tokio::fs::read(path).await?;
        let definition: RuleDefinition = from_slice(&data)?;

        debug!(
            "Snapshot decoded: legacy={}, standard={}, stacked words={}",
            definition.legacy_rules.len(),
            definition.standard_rules.len(),
            definition.stacked_exception_words.len()
        );

        Ok(definition)
    }

    /// 将规则定义写入本地快照
    pub async fn save_snapshot(path: &Path, definition: &RuleDefinition) -> MmResult<()> {
        let mut data = Vec::new();
        // 以 map 形式编码，可选字段允许缺省
        definition.serialize(&mut Serializer::new(&mut data).with_struct_map())?;

        debug!("Snapshot encoded: {} bytes", data.len());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    /// 清除本地快照
    pub async fn clear_snapshot(path: &Path) -> MmResult<()> {
        if tokio::fs::try_exists(path).await? {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }
}

/// 带本地快照的加载器：优先读快照，缺失或损坏时回退到内部加载器并回写快照
pub struct SnapshotRuleLoader<L> {
    inner: L,
    path: PathBuf,
}

impl<L: RuleLoader> SnapshotRuleLoader<L> {
    pub fn new(inner: L, path: impl Into<PathBuf>) -> Self {
        Self { inner, path: path.into() }
    }
}

#[async_trait]
impl<L: RuleLoader> RuleLoader for SnapshotRuleLoader<L> {
    async fn load(&self) -> MmResult<RuleDefinition> {
        // 1. 优先加载本地快照
        match RuleSnapshotManager::load_snapshot(&self.path).await {
            Ok(definition) => {
                debug!("Loaded rules from snapshot {}", self.path.display());
                return Ok(definition);
            }
            Err(e) => warn!("Snapshot unavailable ({}), falling back to {} loader", e, self.inner.name()),
        }

        // 2. 回退到内部加载器
        let definition = self.inner.load().await?;

        // 3. 回写快照（失败不影响本次加载）
        if let Err(e) = RuleSnapshotManager::save_snapshot(&self.path, &definition).await {
            warn!("Failed to write rule snapshot: {}", e);
        } else {
            debug!("Rule snapshot written to {}", self.path.display());
        }

        Ok(definition)
    }

    fn name(&self) -> &str {
        "snapshot"
    }
}

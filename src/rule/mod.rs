//! 规则模块：负责规则的加载、缓存、数据模型定义
pub mod model;
pub mod loader;
pub mod snapshot;
pub mod cache;

// 导出核心接口
pub use self::model::{
    Encoding, PatternRule, RuleDefinition, MatchEvidence, DetectionVerdict, SegmentVerdict, MixedDetection
};
pub use self::loader::{RuleLoader, NoopRuleLoader, StaticRuleLoader, FileRuleLoader};
#[cfg(feature = "remote-loader")]
pub use self::loader::RemoteRuleLoader;
pub use self::snapshot::{RuleSnapshotManager, SnapshotRuleLoader};
pub use self::cache::{RuleCache, RuleStore, LoadOutcome};

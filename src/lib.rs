//! rsmmdetect - 缅甸文编码检测工具
//! 判定文本使用传统字体编码（legacy）还是标准编码（standard），并给出置信度

// 导出全局错误类型
pub use self::error::{MmDetectError, MmResult};

// 导出配置模块
pub use self::config::{DetectorConfig, ConfigManager, CustomConfigBuilder, RetryPolicy};

// 导出规则模块核心接口
pub use self::rule::{
    Encoding, PatternRule, RuleDefinition, MatchEvidence, DetectionVerdict, SegmentVerdict, MixedDetection,
    RuleLoader, NoopRuleLoader, StaticRuleLoader, FileRuleLoader, RuleSnapshotManager, SnapshotRuleLoader,
    RuleCache, RuleStore,
};
#[cfg(feature = "remote-loader")]
pub use self::rule::RemoteRuleLoader;

// 导出编译模块核心接口
pub use self::compiler::{CompiledPattern, CompiledRule, CompiledRuleSet, RuleCompiler};

// 导出检测模块核心接口
pub use self::detector::{
    EncodingDetector,
    CodepointScanner,
    ScanResult,
    RuleMatcher,
    ProbabilityScorer,
    Segmenter,
    init_global_detector,
    init_global_detector_with_rules,
    detect_encoding,
    detect_encoding_segments,
};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod compiler;
pub mod detector;

//! 全局配置管理,存储所有可配置项

use std::path::PathBuf;
use std::time::Duration;

/// 规则加载失败后的重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// 每次调用都重新拉取
    #[default]
    Always,
    /// 失败后不再自动拉取，直到显式 reload
    Never,
    /// 首次失败后最多再重试 n 次
    Times(u32),
}

impl RetryPolicy {
    /// 已失败 `failed_attempts` 次后，是否允许再发起一次拉取
    pub fn allows_attempt(&self, failed_attempts: u32) -> bool {
        match self {
            RetryPolicy::Always => true,
            RetryPolicy::Never => failed_attempts == 0,
            RetryPolicy::Times(n) => failed_attempts <= *n,
        }
    }
}

/// 检测器配置
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    // 是否写入构造时传入的共享规则存储
    pub share_cache: bool,
    // 拉取失败后的重试策略
    pub retry_policy: RetryPolicy,
    // 本地规则文件（JSON）
    pub rule_path: Option<PathBuf>,
    // 是否在规则文件加载器外层包一层本地快照
    pub use_snapshot: bool,
    // 本地规则快照路径（MessagePack）
    pub snapshot_path: PathBuf,
    // 远程拉取超时（构造 RemoteRuleLoader 时使用）
    pub http_timeout: Duration,
    // 是否启用详细日志
    pub verbose: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            share_cache: false,
            retry_policy: RetryPolicy::default(),
            rule_path: None,
            use_snapshot: false,
            snapshot_path: PathBuf::from(".cache/rsmmdetect/rules.mp"),
            http_timeout: Duration::from_secs(30),
            verbose: false,
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> DetectorConfig {
        DetectorConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: DetectorConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn share_cache(mut self, share: bool) -> Self {
        self.config.share_cache = share;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry_policy = policy;
        self
    }

    pub fn rule_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.rule_path = Some(path.into());
        self
    }

    /// 设置快照路径并启用快照
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.snapshot_path = path.into();
        self.config.use_snapshot = true;
        self
    }

    pub fn use_snapshot(mut self, enabled: bool) -> Self {
        self.config.use_snapshot = enabled;
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn build(self) -> DetectorConfig {
        self.config
    }
}

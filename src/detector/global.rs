//! 全局检测器单例管理
//! 维护进程生命周期内唯一的 EncodingDetector 实例，供无法自行持有检测器的展示层调用

use std::sync::Arc;
use once_cell::sync::{Lazy, OnceCell};
use tracing::{debug, info};

use super::detector::EncodingDetector;
use crate::config::DetectorConfig;
use crate::error::{MmDetectError, MmResult};
use crate::rule::{DetectionVerdict, MixedDetection, RuleDefinition, RuleLoader};

/// 全局检测器实例
static GLOBAL_DETECTOR: Lazy<Arc<OnceCell<EncodingDetector>>> = Lazy::new(|| Arc::new(OnceCell::new()));

/// 初始化全局检测器（规则在首次检测时加载）
/// 已初始化则直接返回 Ok(())
pub fn init_global_detector(loader: Arc<dyn RuleLoader>, config: DetectorConfig) -> MmResult<()> {
    if GLOBAL_DETECTOR.get().is_some() {
        debug!("Global detector already initialized, skip reinitialization");
        return Ok(());
    }

    // 并发初始化时只有一个实例被保留，其余直接丢弃
    let _ = GLOBAL_DETECTOR.set(EncodingDetector::new(loader, config));
    info!("Global EncodingDetector initialized");
    Ok(())
}

/// 手动注入规则定义初始化全局检测器
pub fn init_global_detector_with_rules(definition: RuleDefinition, config: DetectorConfig) -> MmResult<()> {
    if GLOBAL_DETECTOR.get().is_some() {
        debug!("Global detector already initialized, skip reinitialization with custom rules");
        return Ok(());
    }

    let detector = EncodingDetector::with_rules(definition, config)?;
    let _ = GLOBAL_DETECTOR.set(detector);
    info!("Global EncodingDetector initialized with custom rule definition");
    Ok(())
}

/// 获取全局检测器
pub(crate) fn get_global_detector() -> MmResult<&'static EncodingDetector> {
    GLOBAL_DETECTOR.get().ok_or(MmDetectError::DetectorNotInitialized)
}

/// 使用全局检测器检测文本
pub async fn detect_encoding(text: &str) -> MmResult<DetectionVerdict> {
    get_global_detector()?.detect(text).await
}

/// 使用全局检测器分段检测文本
pub async fn detect_encoding_segments(text: &str) -> MmResult<MixedDetection> {
    get_global_detector()?.detect_segments(text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use crate::rule::{Encoding, NoopRuleLoader, PatternRule};

    // 全局实例进程内唯一，初始化相关断言放在同一个测试里
    #[tokio::test]
    async fn test_global_detector_lifecycle() {
        assert!(matches!(detect_encoding("\u{1000}").await, Err(MmDetectError::DetectorNotInitialized)));

        let definition = RuleDefinition {
            legacy_rules: vec![PatternRule::new("\u{105A}", 1)],
            ..Default::default()
        };
        init_global_detector_with_rules(definition, ConfigManager::get_default()).unwrap();
        // 重复初始化是幂等的
        init_global_detector(Arc::new(NoopRuleLoader), ConfigManager::get_default()).unwrap();

        let verdict = detect_encoding("\u{105A}").await.unwrap();
        assert_eq!(verdict.encoding, Encoding::Legacy);

        let mixed = detect_encoding_segments("\u{105A} abc \u{1000}").await.unwrap();
        assert_eq!(mixed.segments.len(), 2);
    }
}

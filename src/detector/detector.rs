//! 检测器核心：协调规则缓存，串联 扫描 → 匹配 → 评分，输出检测结果
use std::sync::Arc;
use tracing::{debug, info};

use super::matcher::RuleMatcher;
use super::scanner::CodepointScanner;
use super::scorer::ProbabilityScorer;
use super::segment::Segmenter;
use crate::compiler::{CompiledRuleSet, RuleCompiler};
use crate::config::DetectorConfig;
use crate::error::{MmDetectError, MmResult};
use crate::rule::{
    DetectionVerdict, Encoding, FileRuleLoader, MixedDetection, NoopRuleLoader, RuleCache, RuleDefinition,
    RuleLoader, RuleStore, SegmentVerdict, SnapshotRuleLoader, StaticRuleLoader,
};

/// 编码检测器
#[derive(Clone)]
pub struct EncodingDetector {
    cache: Arc<RuleCache>,
    config: DetectorConfig,
}

impl EncodingDetector {
    /// 创建检测器（规则在首次检测时懒加载）
    pub fn new(loader: Arc<dyn RuleLoader>, config: DetectorConfig) -> Self {
        let cache = RuleCache::new(loader, &config, None);
        Self {
            cache: Arc::new(cache),
            config,
        }
    }

    /// 创建可共享规则存储的检测器（配置 share_cache 开启时生效）
    pub fn with_shared_store(loader: Arc<dyn RuleLoader>, config: DetectorConfig, store: Arc<RuleStore>) -> Self {
        let cache = RuleCache::new(loader, &config, Some(store));
        Self {
            cache: Arc::new(cache),
            config,
        }
    }

    /// 按配置选择加载器：指定了规则文件则读文件（启用快照时优先读快照），否则使用空加载器
    pub fn from_config(config: DetectorConfig) -> Self {
        let loader: Arc<dyn RuleLoader> = match &config.rule_path {
            Some(path) if config.use_snapshot => {
                Arc::new(SnapshotRuleLoader::new(FileRuleLoader::new(path), &config.snapshot_path))
            }
            Some(path) => Arc::new(FileRuleLoader::new(path)),
            None => Arc::new(NoopRuleLoader),
        };
        Self::new(loader, config)
    }

    /// 手动注入规则定义（同步编译并发布，reload 时重新编译同一份定义）
    pub fn with_rules(definition: RuleDefinition, config: DetectorConfig) -> MmResult<Self> {
        let compiled = RuleCompiler::compile(&definition)?;
        let detector = Self::new(Arc::new(StaticRuleLoader::new(definition)), config);
        detector.cache.store().publish(Arc::new(compiled));
        Ok(detector)
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// 确保规则集可用
    pub async fn ensure_ready(&self) -> MmResult<Arc<CompiledRuleSet>> {
        self.cache.ensure_ready().await
    }

    /// 强制重新加载规则
    pub async fn reload(&self) -> MmResult<Arc<CompiledRuleSet>> {
        self.cache.reload().await
    }

    /// 当前缓存的编译后规则集（只读诊断）
    pub fn cached_rules(&self) -> Option<Arc<CompiledRuleSet>> {
        self.cache.get_cached()
    }

    /// 检测单段文本
    pub async fn detect(&self, input: &str) -> MmResult<DetectionVerdict> {
        // 空输入不触碰缓存
        if input.trim().is_empty() {
            return Ok(DetectionVerdict::none());
        }

        let rules = self.rules_or_unavailable().await?;
        let verdict = Self::analyze(input, &rules);
        if self.config.verbose {
            info!(
                "Detected {} (p={:.3}, legacy={}, standard={})",
                verdict.encoding,
                verdict.probability,
                verdict.legacy_matches.len(),
                verdict.standard_matches.len()
            );
        }
        Ok(verdict)
    }

    /// 同步检测：仅使用已缓存的规则集，未缓存时返回不可用
    pub fn detect_now(&self, input: &str) -> MmResult<DetectionVerdict> {
        if input.trim().is_empty() {
            return Ok(DetectionVerdict::none());
        }

        match self.cache.get_cached() {
            Some(rules) => Ok(Self::analyze(input, &rules)),
            None => Err(MmDetectError::RulesUnavailable("规则集尚未加载".to_string())),
        }
    }

    /// 分段检测混合文本，每个片段独立判定
    pub async fn detect_segments(&self, input: &str) -> MmResult<MixedDetection> {
        if input.trim().is_empty() {
            return Ok(MixedDetection::default());
        }

        let rules = self.rules_or_unavailable().await?;
        let segments = Segmenter::split(input)
            .into_iter()
            .map(|segment| SegmentVerdict {
                start: segment.start,
                end: segment.end,
                text: segment.text.to_string(),
                verdict: Self::analyze(segment.text, &rules),
            })
            .collect();

        Ok(MixedDetection { segments })
    }

    /// 纯检测流水线（不涉及缓存）
    pub fn analyze(input: &str, rules: &CompiledRuleSet) -> DetectionVerdict {
        let text = input.trim();
        let scan = CodepointScanner::scan(text);
        if !scan.contains_relevant {
            return DetectionVerdict::none();
        }

        let legacy_matches = RuleMatcher::find_matches(text, rules, Encoding::Legacy);
        let standard_matches = RuleMatcher::find_matches(text, rules, Encoding::Standard);
        let verdict = ProbabilityScorer::score(text, scan, legacy_matches, standard_matches);

        debug!("Detection verdict: {}", verdict);
        verdict
    }

    async fn rules_or_unavailable(&self) -> MmResult<Arc<CompiledRuleSet>> {
        self.cache
            .ensure_ready()
            .await
            .map_err(|e| MmDetectError::RulesUnavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigManager, RetryPolicy};
    use crate::rule::PatternRule;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const EPS: f64 = 1e-9;

    /// 计数加载器
    struct CountingLoader {
        calls: AtomicUsize,
        definition: MmResult<RuleDefinition>,
    }

    impl CountingLoader {
        fn new(definition: MmResult<RuleDefinition>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                definition,
            })
        }
    }

    #[async_trait]
    impl RuleLoader for CountingLoader {
        async fn load(&self) -> MmResult<RuleDefinition> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.definition.clone()
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    /// 小型规则集：传统编码把 e 元音写在辅音前（词首），标准编码写在辅音后
    fn sample_rules() -> RuleDefinition {
        RuleDefinition {
            legacy_rules: vec![
                PatternRule::new("(?:^|\\s)\u{1031}[\u{1000}-\u{1021}]", 2)
                    .with_description("word-initial e-vowel"),
                PatternRule::new("[\u{105A}\u{1060}-\u{1097}]", 1).with_description("legacy-only codepoints"),
            ],
            standard_rules: vec![
                PatternRule::new("[\u{1000}-\u{1021}]\u{1031}", 2).with_description("e-vowel after consonant"),
            ],
            stacked_exception_words: Vec::new(),
        }
    }

    fn detector_with(loader: Arc<CountingLoader>) -> EncodingDetector {
        EncodingDetector::new(loader, ConfigManager::get_default())
    }

    #[tokio::test]
    async fn test_empty_input_skips_cache() {
        let loader = CountingLoader::new(Ok(sample_rules()));
        let detector = detector_with(loader.clone());

        for input in ["", "   ", "\n\t "] {
            let verdict = detector.detect(input).await.unwrap();
            assert_eq!(verdict.encoding, Encoding::None);
            assert_eq!(verdict.probability, 0.0);
            assert!(verdict.legacy_matches.is_empty() && verdict.standard_matches.is_empty());
        }
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
        assert!(detector.cached_rules().is_none());
    }

    #[tokio::test]
    async fn test_no_relevant_codepoints() {
        let detector = detector_with(CountingLoader::new(Ok(sample_rules())));
        let verdict = detector.detect("Hello, world! 123").await.unwrap();
        assert_eq!(verdict.encoding, Encoding::None);
        assert_eq!(verdict.probability, 0.0);
        assert!(!verdict.contains_relevant_codepoints);
    }

    #[tokio::test]
    async fn test_extended_only_input() {
        let detector = detector_with(CountingLoader::new(Ok(sample_rules())));

        let verdict = detector.detect("\u{AA60}\u{AA61}\u{A9E0}\u{A9E1}").await.unwrap();
        assert_eq!(verdict.encoding, Encoding::Standard);
        assert!((verdict.probability - 1.0).abs() < EPS);

        let verdict = detector.detect("\u{AA60} x \u{A9E5} y").await.unwrap();
        assert_eq!(verdict.encoding, Encoding::Standard);
        assert!(verdict.probability >= 0.9);
    }

    #[tokio::test]
    async fn test_single_standalone_letter_with_noop_rules() {
        let detector = EncodingDetector::new(Arc::new(NoopRuleLoader), ConfigManager::get_default());
        let verdict = detector.detect("\u{1000}").await.unwrap();
        assert_eq!(verdict.encoding, Encoding::Standard);
        assert!((verdict.probability - 0.5).abs() < EPS);
    }

    #[tokio::test]
    async fn test_single_legacy_exclusive_codepoint() {
        let detector = detector_with(CountingLoader::new(Ok(sample_rules())));
        let verdict = detector.detect("\u{105A}").await.unwrap();
        assert_eq!(verdict.encoding, Encoding::Legacy);
        assert!((verdict.probability - 1.0).abs() < EPS);
        assert_eq!(verdict.legacy_matches.len(), 1);
        assert_eq!(verdict.legacy_matches[0].source_pattern_id, 1);
    }

    #[tokio::test]
    async fn test_detect_is_idempotent() {
        let loader = CountingLoader::new(Ok(sample_rules()));
        let detector = detector_with(loader.clone());
        let input = "\u{1000}\u{1031}\u{1000}\u{102C} \u{1001}\u{1031}";

        let first = detector.detect(input).await.unwrap();
        let second = detector.detect(input).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(detector.detect_now(input).unwrap(), first);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mixed_input_segments() {
        let detector = detector_with(CountingLoader::new(Ok(sample_rules())));
        // 传统编码片段 + ASCII + 标准编码片段
        let legacy_span = "\u{1031}\u{1000}";
        let standard_span = "\u{1000}\u{1031}\u{1000}\u{102C}";
        let input = format!("{} abc {}", legacy_span, standard_span);

        let mixed = detector.detect_segments(&input).await.unwrap();
        assert_eq!(mixed.segments.len(), 2);
        assert!(mixed.is_mixed());

        let legacy = &mixed.segments[0];
        assert_eq!(legacy.text, legacy_span);
        assert_eq!(legacy.verdict.encoding, Encoding::Legacy);
        assert!((legacy.verdict.probability - 1.0).abs() < EPS);

        let standard = &mixed.segments[1];
        assert_eq!(&input[standard.start..standard.end], standard_span);
        assert_eq!(standard.verdict.encoding, Encoding::Standard);
        // U=1, L=0：分段 [0.4, 0.5] 按 1/4 插值，加 4 个字符的奖励
        assert!((standard.verdict.probability - (0.4 + 0.1 * 0.25 + 0.04)).abs() < EPS);

        // 整体判定时双方证据相等，只能给出保守结果
        let whole = detector.detect(&input).await.unwrap();
        assert_eq!(whole.legacy_matches.len(), 1);
        assert_eq!(whole.standard_matches.len(), 1);
        assert!(whole.probability < 0.1);
    }

    #[tokio::test]
    async fn test_load_failure_surfaces_unavailable() {
        let loader = CountingLoader::new(Err(MmDetectError::RuleLoadError("offline".to_string())));
        let config = ConfigManager::custom().retry_policy(RetryPolicy::Always).build();
        let detector = EncodingDetector::new(loader.clone(), config);

        let err = detector.detect("\u{1000}").await.unwrap_err();
        assert!(matches!(err, MmDetectError::RulesUnavailable(ref msg) if msg.contains("offline")));
        assert!(matches!(detector.detect_now("\u{1000}"), Err(MmDetectError::RulesUnavailable(_))));

        // 每次检测都重新尝试
        let _ = detector.detect("\u{1000}").await;
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_with_rules_is_ready_immediately() {
        let detector = EncodingDetector::with_rules(sample_rules(), ConfigManager::get_default()).unwrap();
        assert!(detector.cached_rules().is_some());

        let verdict = detector.detect_now("\u{1031}\u{1000}").unwrap();
        assert_eq!(verdict.encoding, Encoding::Legacy);

        let reloaded = detector.reload().await.unwrap();
        assert_eq!(reloaded.rule_count(), 3);
    }

    #[tokio::test]
    async fn test_with_rules_rejects_malformed_pattern() {
        let definition = RuleDefinition {
            legacy_rules: vec![PatternRule::new("[", 1)],
            ..Default::default()
        };
        let result = EncodingDetector::with_rules(definition, ConfigManager::get_default());
        assert!(matches!(result, Err(MmDetectError::RuleCompileError { .. })));
    }

    #[tokio::test]
    async fn test_from_config_honours_snapshot() {
        let dir = std::env::temp_dir().join(format!("rsmmdetect_from_config_{}", std::process::id()));
        let rule_path = dir.join("rules.json");
        let snapshot_path = dir.join("rules.mp");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(&rule_path, serde_json::to_vec(&sample_rules()).unwrap()).await.unwrap();
        let _ = crate::rule::RuleSnapshotManager::clear_snapshot(&snapshot_path).await;

        let config = ConfigManager::custom()
            .rule_path(&rule_path)
            .snapshot_path(&snapshot_path)
            .build();
        let detector = EncodingDetector::from_config(config);
        assert_eq!(detector.ensure_ready().await.unwrap().rule_count(), 3);

        // 首次加载后快照已回写
        let snapshot = crate::rule::RuleSnapshotManager::load_snapshot(&snapshot_path).await.unwrap();
        assert_eq!(snapshot, sample_rules());

        // 未启用快照时不写快照
        crate::rule::RuleSnapshotManager::clear_snapshot(&snapshot_path).await.unwrap();
        let config = ConfigManager::custom().rule_path(&rule_path).build();
        EncodingDetector::from_config(config).ensure_ready().await.unwrap();
        assert!(!tokio::fs::try_exists(&snapshot_path).await.unwrap());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_shared_store_detectors() {
        let store = RuleStore::new_shared();
        let config = ConfigManager::custom().share_cache(true).build();
        let loader = CountingLoader::new(Ok(sample_rules()));

        let first = EncodingDetector::with_shared_store(loader.clone(), config.clone(), store.clone());
        let second = EncodingDetector::with_shared_store(loader.clone(), config, store.clone());

        first.detect("\u{1000}").await.unwrap();
        assert!(second.detect_now("\u{1000}").is_ok());
        second.detect("\u{1000}").await.unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }
}

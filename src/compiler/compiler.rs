//! 规则编译器核心
//! 仅负责将原始规则定义编译为可执行的正则模式，任一模式非法即整体失败

use std::time::Instant;
use regex::Regex;
use tracing::debug;

use super::pattern::{CompiledPattern, CompiledRule, CompiledRuleSet};
use crate::error::{MmDetectError, MmResult};
use crate::rule::{Encoding, PatternRule, RuleDefinition};

/// 规则编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 编译规则定义
    pub fn compile(definition: &RuleDefinition) -> MmResult<CompiledRuleSet> {
        let start = Instant::now();
        let mut stats = CompileStats::default();

        let legacy_rules = Self::compile_rule_list(&definition.legacy_rules, Encoding::Legacy, &mut stats)?;
        let standard_rules = Self::compile_rule_list(&definition.standard_rules, Encoding::Standard, &mut stats)?;

        // 空串会让前缀判断恒真，直接丢弃
        let stacked_exception_words: Vec<String> = definition
            .stacked_exception_words
            .iter()
            .filter(|w| !w.is_empty())
            .cloned()
            .collect();

        debug!("Rule compilation finished in {:?}", start.elapsed());
        debug!(
            "Compile stats: legacy={}, standard={}, excludes={}, stacked words={}",
            stats.legacy_count,
            stats.standard_count,
            stats.exclude_count,
            stacked_exception_words.len()
        );

        Ok(CompiledRuleSet {
            legacy_rules,
            standard_rules,
            stacked_exception_words,
        })
    }

    /// 编译某一编码下的全部规则（保持声明顺序）
    fn compile_rule_list(
        rules: &[PatternRule],
        encoding: Encoding,
        stats: &mut CompileStats,
    ) -> MmResult<Vec<CompiledRule>> {
        let mut compiled = Vec::with_capacity(rules.len());
        for (id, rule) in rules.iter().enumerate() {
            compiled.push(Self::compile_rule(id, rule, encoding, stats)?);
        }
        Ok(compiled)
    }

    /// 编译单条规则
    fn compile_rule(
        id: usize,
        rule: &PatternRule,
        encoding: Encoding,
        stats: &mut CompileStats,
    ) -> MmResult<CompiledRule> {
        let pattern = Self::compile_single_pattern(&rule.pattern)?;

        let mut excludes = Vec::new();
        for exclude in rule.exclude_patterns.iter().flatten() {
            excludes.push(Self::compile_anchored_pattern(exclude)?);
        }

        stats.exclude_count += excludes.len();
        match encoding {
            Encoding::Legacy => stats.legacy_count += 1,
            Encoding::Standard => stats.standard_count += 1,
            Encoding::None => {}
        }

        Ok(CompiledRule {
            id,
            encoding,
            pattern,
            min_input_length: rule.min_input_length,
            max_input_length: rule.max_input_length.filter(|max| *max > 0),
            description: rule.description.clone(),
            excludes,
            // 仅传统编码规则支持该标记
            suppress_on_stacked_word: encoding == Encoding::Legacy
                && rule.suppress_on_stacked_word.unwrap_or(false),
        })
    }

    /// 编译单个正则模式
    fn compile_single_pattern(raw_pattern: &str) -> MmResult<CompiledPattern> {
        if raw_pattern.is_empty() {
            return Err(MmDetectError::RuleCompileError {
                pattern: raw_pattern.to_string(),
                reason: "empty pattern".to_string(),
            });
        }

        let regex = Regex::new(raw_pattern).map_err(|e| MmDetectError::RuleCompileError {
            pattern: raw_pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(CompiledPattern {
            regex,
            source: raw_pattern.to_string(),
        })
    }

    /// 编译排除模式：隐式锚定到被测子串开头
    fn compile_anchored_pattern(raw_pattern: &str) -> MmResult<CompiledPattern> {
        // 先单独校验，避免分组包裹后报错信息偏移
        Self::compile_single_pattern(raw_pattern)?;

        let anchored = format!("^(?:{})", raw_pattern);
        let regex = Regex::new(&anchored).map_err(|e| MmDetectError::RuleCompileError {
            pattern: raw_pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(CompiledPattern {
            regex,
            source: raw_pattern.to_string(),
        })
    }
}

/// 编译统计信息
#[derive(Debug, Clone, Default)]
struct CompileStats {
    legacy_count: usize,
    standard_count: usize,
    exclude_count: usize,
}

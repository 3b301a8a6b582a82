//! 编译后模式模型
//! 规则编译后的结构，构造完成后只读

use std::fmt;
use regex::Regex;

use crate::rule::Encoding;

/// 编译后的正则模式（可重复扫描）
#[derive(Clone)]
pub struct CompiledPattern {
    pub regex: Regex,
    // 原始模式串（诊断用）
    pub source: String,
}

impl CompiledPattern {
    /// 模式是否在 `input` 开头处命中（排除模式已在编译期锚定）
    pub fn matches_at_start(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }
}

impl fmt::Debug for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompiledPattern").field(&self.source).finish()
    }
}

/// 单条编译后规则
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub id: usize,
    pub encoding: Encoding,
    pub pattern: CompiledPattern,
    pub min_input_length: usize,
    // None 表示不设上限（原始值缺省或为 0）
    pub max_input_length: Option<usize>,
    pub description: Option<String>,
    pub excludes: Vec<CompiledPattern>,
    pub suppress_on_stacked_word: bool,
}

impl CompiledRule {
    /// 输入长度（字符数）是否落在规则的长度门限内
    pub fn accepts_length(&self, len: usize) -> bool {
        if len < self.min_input_length {
            return false;
        }
        match self.max_input_length {
            Some(max) => len <= max,
            None => true,
        }
    }
}

/// 编译后的规则集
#[derive(Debug, Clone, Default)]
pub struct CompiledRuleSet {
    pub legacy_rules: Vec<CompiledRule>,
    pub standard_rules: Vec<CompiledRule>,
    pub stacked_exception_words: Vec<String>,
}

impl CompiledRuleSet {
    /// 指定编码的规则列表（按声明顺序）
    pub fn rules_for(&self, encoding: Encoding) -> &[CompiledRule] {
        match encoding {
            Encoding::Legacy => &self.legacy_rules,
            Encoding::Standard => &self.standard_rules,
            Encoding::None => &[],
        }
    }

    pub fn rule_count(&self) -> usize {
        self.legacy_rules.len() + self.standard_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }
}

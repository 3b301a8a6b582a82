//! 规则数据模型定义
//! 规则定义（支持序列化/反序列化）与检测结果模型，无任何业务逻辑

use std::fmt;
use serde::{Deserialize, Serialize};

/// 编码判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// 传统字体编码（字体 hack）
    Legacy,
    /// 标准编码
    Standard,
    /// 无相关字符，无法判定
    None,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Legacy => "legacy",
            Encoding::Standard => "standard",
            Encoding::None => "none",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单条模式规则（JSON 字段为 camelCase）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRule {
    pub pattern: String,
    pub min_input_length: usize,
    // 缺省或 0 表示不设上限
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_input_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppress_on_stacked_word: Option<bool>,
}

impl PatternRule {
    /// 以最小长度快速创建（其余字段为空）
    pub fn new(pattern: impl Into<String>, min_input_length: usize) -> Self {
        Self {
            pattern: pattern.into(),
            min_input_length,
            max_input_length: None,
            description: None,
            exclude_patterns: None,
            suppress_on_stacked_word: None,
        }
    }

    pub fn with_max_input_length(mut self, max: usize) -> Self {
        self.max_input_length = Some(max);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_excludes<I, S>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns = Some(excludes.into_iter().map(Into::into).collect());
        self
    }

    pub fn suppress_on_stacked_word(mut self, suppress: bool) -> Self {
        self.suppress_on_stacked_word = Some(suppress);
        self
    }
}

/// 完整规则定义（加载一次后不可变）
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDefinition {
    #[serde(default)]
    pub legacy_rules: Vec<PatternRule>,
    #[serde(default)]
    pub standard_rules: Vec<PatternRule>,
    #[serde(default)]
    pub stacked_exception_words: Vec<String>,
}

impl RuleDefinition {
    /// 无任何规则（no-op 加载器的结果）
    pub fn is_empty(&self) -> bool {
        self.legacy_rules.is_empty() && self.standard_rules.is_empty()
    }

    pub fn rule_count(&self) -> usize {
        self.legacy_rules.len() + self.standard_rules.len()
    }
}

/// 单次命中证据（start/end 为修剪后输入的字节偏移）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchEvidence {
    pub start: usize,
    pub end: usize,
    pub matched_text: String,
    // 规则在所属编码规则列表中的声明序号
    pub source_pattern_id: usize,
    pub encoding: Encoding,
}

/// 单段文本的检测结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionVerdict {
    pub encoding: Encoding,
    pub probability: f64,
    pub contains_relevant_codepoints: bool,
    pub standard_block_count: usize,
    pub extended_block_count: usize,
    pub legacy_matches: Vec<MatchEvidence>,
    pub standard_matches: Vec<MatchEvidence>,
}

impl DetectionVerdict {
    /// 无法判定（空输入 / 无相关字符）
    pub fn none() -> Self {
        Self {
            encoding: Encoding::None,
            probability: 0.0,
            contains_relevant_codepoints: false,
            standard_block_count: 0,
            extended_block_count: 0,
            legacy_matches: Vec::new(),
            standard_matches: Vec::new(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.encoding == Encoding::None
    }

    pub fn relevant_count(&self) -> usize {
        self.standard_block_count + self.extended_block_count
    }
}

impl fmt::Display for DetectionVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.3}, legacy={}, standard={})",
            self.encoding,
            self.probability,
            self.legacy_matches.len(),
            self.standard_matches.len()
        )
    }
}

/// 混合文本中单个片段的检测结果（start/end 为原始输入的字节偏移）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentVerdict {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub verdict: DetectionVerdict,
}

/// 分段检测结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MixedDetection {
    pub segments: Vec<SegmentVerdict>,
}

impl MixedDetection {
    /// 同时出现传统编码片段与标准编码片段
    pub fn is_mixed(&self) -> bool {
        let has = |enc: Encoding| self.segments.iter().any(|s| s.verdict.encoding == enc);
        has(Encoding::Legacy) && has(Encoding::Standard)
    }

    /// 按相关字符数加权的主导编码
    pub fn dominant(&self) -> Encoding {
        let weight = |enc: Encoding| -> usize {
            self.segments
                .iter()
                .filter(|s| s.verdict.encoding == enc)
                .map(|s| s.verdict.relevant_count())
                .sum()
        };

        let legacy = weight(Encoding::Legacy);
        let standard = weight(Encoding::Standard);
        match (legacy, standard) {
            (0, 0) => Encoding::None,
            (l, s) if l > s => Encoding::Legacy,
            _ => Encoding::Standard,
        }
    }
}

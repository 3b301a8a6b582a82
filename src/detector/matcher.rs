//! 规则匹配器：在输入上执行某一编码的全部规则，输出带位置的命中证据
use tracing::trace;

use crate::compiler::{CompiledRule, CompiledRuleSet};
use crate::rule::{Encoding, MatchEvidence};

/// 规则匹配器
pub struct RuleMatcher;

impl RuleMatcher {
    /// 执行指定编码的规则
    /// 结果顺序：先按规则声明顺序，再按命中位置从左到右
    pub fn find_matches(input: &str, rule_set: &CompiledRuleSet, encoding: Encoding) -> Vec<MatchEvidence> {
        let input_len = input.chars().count();
        let mut evidence = Vec::new();

        for rule in rule_set.rules_for(encoding) {
            // 长度门限
            if !rule.accepts_length(input_len) {
                continue;
            }

            // find_iter 不重叠，且从上一次命中的末尾继续
            for m in rule.pattern.regex.find_iter(input) {
                if m.is_empty() {
                    continue;
                }

                let rest = &input[m.start()..];
                if Self::is_suppressed(rule, rest, &rule_set.stacked_exception_words) {
                    trace!(
                        "Suppressed {} match at {}: rule #{} ({})",
                        encoding,
                        m.start(),
                        rule.id,
                        rule.pattern.source
                    );
                    continue;
                }

                evidence.push(MatchEvidence {
                    start: m.start(),
                    end: m.end(),
                    matched_text: m.as_str().to_string(),
                    source_pattern_id: rule.id,
                    encoding,
                });
            }
        }

        evidence
    }

    /// 排除模式（锚定在命中起点）或叠字例外词命中时丢弃该次命中
    fn is_suppressed(rule: &CompiledRule, rest: &str, stacked_words: &[String]) -> bool {
        if rule.excludes.iter().any(|exclude| exclude.matches_at_start(rest)) {
            return true;
        }

        rule.suppress_on_stacked_word && stacked_words.iter().any(|word| rest.starts_with(word.as_str()))
    }
}

//! 概率评分器
//! 将两种编码的命中证据换算为单一判定与置信度，纯函数、确定性
//! 所有分段阈值均为固定标定常数，按查表方式使用

use super::scanner::{CodepointScanner, ScanResult};
use crate::rule::{DetectionVerdict, Encoding, MatchEvidence};

/// 计数分段：命中数 ≥ min 时在 [lo, hi] 内取值
#[derive(Debug, Clone, Copy)]
struct Band {
    min: usize,
    lo: f64,
    hi: f64,
}

const fn band(min: usize, lo: f64, hi: f64) -> Band {
    Band { min, lo, hi }
}

/// 容差分段：标准命中数 ≥ min_standard 时使用
#[derive(Debug, Clone, Copy)]
struct Tolerance {
    min_standard: usize,
    acceptable_diff: usize,
    min_legacy_ratio: f64,
}

const fn tolerance(min_standard: usize, acceptable_diff: usize, min_legacy_ratio: f64) -> Tolerance {
    Tolerance { min_standard, acceptable_diff, min_legacy_ratio }
}

// ===== 仅扩展区块 =====
const EXTENDED_ONLY_BASE: f64 = 0.90;
const EXTENDED_ONLY_SPAN: f64 = 0.09;

// ===== L == U == 0 =====
const NO_MATCH_FULL_COVERAGE: f64 = 0.99;
const NO_MATCH_DENSE_MIN: usize = 10;
const NO_MATCH_DENSE_BAND: Band = band(NO_MATCH_DENSE_MIN, 0.31, 0.5);
const NO_MATCH_SPARSE_BAND: Band = band(0, 0.1, 0.5);

// ===== L == U > 0，仅按 L 取值 =====
const EQUAL_MATCH_BANDS: [Band; 4] = [
    band(30, 0.15, 0.25),
    band(8, 0.08, 0.15),
    band(5, 0.05, 0.08),
    band(3, 0.025, 0.05),
];
const EQUAL_MATCH_FLOOR: f64 = 0.025;

// ===== L > U == 0，按 L / 相关字符数插值 =====
const LEGACY_ONLY_BANDS: [Band; 6] = [
    band(30, 0.6, 0.85),
    band(8, 0.5, 0.74),
    band(5, 0.4, 0.6),
    band(3, 0.2, 0.5),
    band(2, 0.1, 0.2),
    band(1, 0.01, 0.09),
];

// ===== U > L == 0，按 U / 相关字符数插值，另加字符数奖励 =====
const STANDARD_ONLY_BANDS: [Band; 4] = [
    band(30, 0.6, 0.85),
    band(8, 0.5, 0.7),
    band(3, 0.45, 0.6),
    band(1, 0.4, 0.5),
];
const STANDARD_ONLY_BONUS_PER_CODEPOINT: f64 = 0.01;
const STANDARD_ONLY_BONUS_CAP: f64 = 0.2;

// ===== U > L > 0，判断是否翻转为传统编码 =====
const TOLERANCE_BANDS: [Tolerance; 7] = [
    tolerance(20, 4, 0.15),
    tolerance(14, 3, 0.12),
    tolerance(11, 3, 0.10),
    tolerance(9, 2, 0.08),
    tolerance(6, 2, 0.05),
    tolerance(3, 1, 0.03),
    tolerance(0, 1, 0.02),
];

// ===== 双方均有命中时的阻尼系数 =====
const DAMPING_BANDS: [(usize, f64); 3] = [(8, 1.5), (5, 2.0), (3, 3.0)];
const DAMPING_FLOOR: f64 = 4.0;

/// 概率评分器
pub struct ProbabilityScorer;

impl ProbabilityScorer {
    /// 评分（`input` 为已修剪的输入）
    pub fn score(
        input: &str,
        scan: ScanResult,
        legacy_matches: Vec<MatchEvidence>,
        standard_matches: Vec<MatchEvidence>,
    ) -> DetectionVerdict {
        // 1. 无相关字符
        if !scan.contains_relevant {
            return DetectionVerdict::none();
        }

        let input_len = input.chars().count().max(1);
        let total = scan.total();

        // 2. 仅扩展区块：暂定为标准编码
        let provisional = if scan.is_extended_only() {
            Some(EXTENDED_ONLY_BASE + EXTENDED_ONLY_SPAN * ratio(scan.extended_count, input_len))
        } else {
            None
        };

        // 3/4. 三个互斥分支，均覆盖暂定结果
        let l = legacy_matches.len();
        let u = standard_matches.len();
        let (encoding, probability) = if l == u {
            Self::score_equal(input, scan, l, provisional)
        } else if l > u {
            let p = if u == 0 {
                if Self::covers_all_relevant(input, &legacy_matches, total) {
                    1.0
                } else {
                    interpolate(&LEGACY_ONLY_BANDS, l, ratio(l, total)).unwrap_or(0.0)
                }
            } else {
                damped_share(l, u)
            };
            (Encoding::Legacy, p)
        } else {
            Self::score_standard_leading(input, total, l, u, &standard_matches)
        };

        DetectionVerdict {
            encoding,
            probability: probability.clamp(0.0, 1.0),
            contains_relevant_codepoints: true,
            standard_block_count: scan.standard_count,
            extended_block_count: scan.extended_count,
            legacy_matches,
            standard_matches,
        }
    }

    /// L == U
    fn score_equal(input: &str, scan: ScanResult, count: usize, provisional: Option<f64>) -> (Encoding, f64) {
        if count > 0 {
            let p = EQUAL_MATCH_BANDS
                .iter()
                .enumerate()
                .find(|(_, b)| count >= b.min)
                .map(|(i, b)| {
                    let ceiling = if i == 0 { b.min * 2 } else { EQUAL_MATCH_BANDS[i - 1].min };
                    lerp(b, ratio(count - b.min, ceiling - b.min))
                })
                .unwrap_or(EQUAL_MATCH_FLOOR);
            return (Encoding::Legacy, p);
        }

        // 仅扩展区块且无任何命中
        if let Some(provisional) = provisional {
            let p = if scan.extended_count >= input.chars().count() { 1.0 } else { provisional };
            return (Encoding::Standard, p);
        }

        let total = scan.total();
        let coverage = ratio(total, input.chars().count().max(1));
        let p = if total >= NO_MATCH_DENSE_MIN && coverage >= 1.0 {
            NO_MATCH_FULL_COVERAGE
        } else if total >= NO_MATCH_DENSE_MIN {
            lerp(&NO_MATCH_DENSE_BAND, coverage)
        } else {
            lerp(&NO_MATCH_SPARSE_BAND, coverage)
        };
        (Encoding::Standard, p)
    }

    /// U > L
    fn score_standard_leading(
        input: &str,
        total: usize,
        l: usize,
        u: usize,
        standard_matches: &[MatchEvidence],
    ) -> (Encoding, f64) {
        if l == 0 {
            if Self::covers_all_relevant(input, standard_matches, total) {
                return (Encoding::Standard, 1.0);
            }
            let base = interpolate(&STANDARD_ONLY_BANDS, u, ratio(u, total)).unwrap_or(0.0);
            let bonus = (STANDARD_ONLY_BONUS_PER_CODEPOINT * total as f64).min(STANDARD_ONLY_BONUS_CAP);
            return (Encoding::Standard, base + bonus);
        }

        let band = TOLERANCE_BANDS
            .iter()
            .find(|t| u >= t.min_standard)
            .unwrap_or(&TOLERANCE_BANDS[TOLERANCE_BANDS.len() - 1]);

        let legacy_ratio = l as f64 / total.max(1) as f64;
        if l + band.acceptable_diff >= u && legacy_ratio >= band.min_legacy_ratio {
            (Encoding::Legacy, damped_share(l, u))
        } else {
            (Encoding::Standard, damped_share(u, l))
        }
    }

    /// 命中区间的并集是否覆盖输入中全部相关字符
    fn covers_all_relevant(input: &str, matches: &[MatchEvidence], total: usize) -> bool {
        if total == 0 || matches.is_empty() {
            return false;
        }

        let mut spans: Vec<(usize, usize)> = matches.iter().map(|m| (m.start, m.end)).collect();
        spans.sort_unstable();

        let mut covered = 0;
        let mut span_iter = spans.into_iter().peekable();
        let mut current: Option<(usize, usize)> = None;
        for (idx, ch) in input.char_indices() {
            // 推进到可能包含 idx 的区间
            while let Some(&(start, end)) = span_iter.peek() {
                if start > idx {
                    break;
                }
                current = match current {
                    Some((s, e)) if e >= end => Some((s, e)),
                    _ => Some((start, end)),
                };
                span_iter.next();
            }
            let inside = matches!(current, Some((_, end)) if idx < end);
            if inside && CodepointScanner::is_relevant(ch) {
                covered += 1;
            }
        }

        covered >= total
    }
}

/// 在分段表中定位计数所属分段，并按比例插值
fn interpolate(bands: &[Band], count: usize, t: f64) -> Option<f64> {
    bands.iter().find(|b| count >= b.min).map(|b| lerp(b, t))
}

fn lerp(band: &Band, t: f64) -> f64 {
    band.lo + (band.hi - band.lo) * t.clamp(0.0, 1.0)
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64).min(1.0)
}

/// winner / (winner + loser) 再除以按 winner 计数选取的阻尼系数
fn damped_share(winner: usize, loser: usize) -> f64 {
    let share = winner as f64 / (winner + loser).max(1) as f64;
    let damping = DAMPING_BANDS
        .iter()
        .find(|(min, _)| winner >= *min)
        .map(|(_, d)| *d)
        .unwrap_or(DAMPING_FLOOR);
    share / damping
}

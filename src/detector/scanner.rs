//! 码位扫描器：与规则无关的快速预扫描

use std::ops::RangeInclusive;

/// 缅甸文基本区块
pub const STANDARD_BLOCK: RangeInclusive<u32> = 0x1000..=0x109F;
/// 缅甸文扩展 A 区块
pub const EXTENDED_A_BLOCK: RangeInclusive<u32> = 0xAA60..=0xAA7F;
/// 缅甸文扩展 B 区块
pub const EXTENDED_B_BLOCK: RangeInclusive<u32> = 0xA9E0..=0xA9FF;

/// 扫描结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub contains_relevant: bool,
    pub standard_count: usize,
    // 扩展 A + 扩展 B 合计
    pub extended_count: usize,
}

impl ScanResult {
    pub fn total(&self) -> usize {
        self.standard_count + self.extended_count
    }

    /// 仅含扩展区块字符（传统编码不会出现扩展区块）
    pub fn is_extended_only(&self) -> bool {
        self.standard_count == 0 && self.extended_count > 0
    }
}

/// 码位扫描器
pub struct CodepointScanner;

impl CodepointScanner {
    /// O(n) 统计各区块字符数
    pub fn scan(input: &str) -> ScanResult {
        let mut result = ScanResult::default();
        for ch in input.chars() {
            let cp = ch as u32;
            if STANDARD_BLOCK.contains(&cp) {
                result.standard_count += 1;
            } else if EXTENDED_A_BLOCK.contains(&cp) || EXTENDED_B_BLOCK.contains(&cp) {
                result.extended_count += 1;
            }
        }
        result.contains_relevant = result.total() > 0;
        result
    }

    /// 单个字符是否属于相关区块
    pub fn is_relevant(ch: char) -> bool {
        let cp = ch as u32;
        STANDARD_BLOCK.contains(&cp) || EXTENDED_A_BLOCK.contains(&cp) || EXTENDED_B_BLOCK.contains(&cp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_plain_ascii() {
        let result = CodepointScanner::scan("hello, world 123");
        assert!(!result.contains_relevant);
        assert_eq!(result.total(), 0);
    }

    #[test]
    fn test_scan_counts_blocks() {
        let result = CodepointScanner::scan("\u{1000} \u{AA60}\u{A9E0} abc");
        assert!(result.contains_relevant);
        assert_eq!(result.standard_count, 1);
        assert_eq!(result.extended_count, 2);
        assert!(!result.is_extended_only());
    }

    #[test]
    fn test_scan_block_boundaries() {
        let input: String = [0x0FFF, 0x1000, 0x109F, 0x10A0, 0xA9DF, 0xA9FF, 0xAA7F, 0xAA80]
            .iter()
            .filter_map(|cp| char::from_u32(*cp))
            .collect();
        let result = CodepointScanner::scan(&input);
        assert_eq!(result.standard_count, 2);
        assert_eq!(result.extended_count, 2);
    }

    #[test]
    fn test_extended_only() {
        let result = CodepointScanner::scan("\u{AA60}\u{AA61}\u{A9E0}\u{A9E1}");
        assert!(result.is_extended_only());
        assert_eq!(result.extended_count, 4);
        assert!(CodepointScanner::is_relevant('\u{AA60}'));
        assert!(!CodepointScanner::is_relevant('a'));
    }
}

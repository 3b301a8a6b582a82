//! 混合文本分段
//! 以“含非空白（零宽空格视同空白）字符的非相关字符串”（ASCII 单词、数字、标点等）为分隔，
//! 切出若干只含相关字符与空白的片段；片段之间各自独立判定

use super::scanner::CodepointScanner;

/// 输入中的一个片段（字节偏移，左闭右开）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

/// 分段器
pub struct Segmenter;

// 零宽空格 / 零宽非连接符常见于缅甸文断词，按空白处理
fn is_separator_like(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '\u{200B}' | '\u{200C}')
}

impl Segmenter {
    pub fn split(input: &str) -> Vec<Segment<'_>> {
        let mut segments = Vec::new();
        // 当前片段的 [首个相关字符起点, 最后一个相关字符终点)
        let mut open: Option<(usize, usize)> = None;

        for (idx, ch) in input.char_indices() {
            if CodepointScanner::is_relevant(ch) {
                let end = idx + ch.len_utf8();
                open = Some(match open {
                    Some((start, _)) => (start, end),
                    None => (idx, end),
                });
            } else if !is_separator_like(ch) {
                if let Some((start, end)) = open.take() {
                    segments.push(Segment { start, end, text: &input[start..end] });
                }
            }
        }

        if let Some((start, end)) = open {
            segments.push(Segment { start, end, text: &input[start..end] });
        }

        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_ascii_runs() {
        let input = "\u{1000}\u{1001} \u{1002} -- abc \u{1003}";
        let segments = Segmenter::split(input);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "\u{1000}\u{1001} \u{1002}");
        assert_eq!(segments[1].text, "\u{1003}");
        assert_eq!(&input[segments[1].start..segments[1].end], "\u{1003}");
    }

    #[test]
    fn test_whitespace_does_not_split() {
        let segments = Segmenter::split("  \u{1000}   \u{1001}\n\u{1002}  ");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, 2);
    }

    #[test]
    fn test_zero_width_chars_do_not_split() {
        let input = "\u{1000}\u{200B}\u{1001}\u{200C}\u{1002} x \u{1003}";
        let segments = Segmenter::split(input);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "\u{1000}\u{200B}\u{1001}\u{200C}\u{1002}");
        assert_eq!(segments[1].text, "\u{1003}");
    }

    #[test]
    fn test_no_relevant_text() {
        assert!(Segmenter::split("only ascii 123").is_empty());
        assert!(Segmenter::split("").is_empty());
    }
}

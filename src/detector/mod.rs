//! 检测模块：编码检测核心逻辑
pub mod scanner;
pub mod matcher;
pub mod scorer;
pub mod segment;
pub mod detector;
pub mod global;

// 导出核心接口
pub use self::scanner::{CodepointScanner, ScanResult};
pub use self::matcher::RuleMatcher;
pub use self::scorer::ProbabilityScorer;
pub use self::segment::{Segment, Segmenter};
pub use self::detector::EncodingDetector;
pub use self::global::{
    init_global_detector,
    init_global_detector_with_rules,
    detect_encoding,
    detect_encoding_segments,
};

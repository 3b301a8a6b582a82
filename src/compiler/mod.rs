//! 编译模块：将原始规则定义编译为可执行的正则模式
pub mod pattern;
pub mod compiler;

pub use self::pattern::{CompiledPattern, CompiledRule, CompiledRuleSet};
pub use self::compiler::RuleCompiler;

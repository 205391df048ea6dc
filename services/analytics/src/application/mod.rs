//! 应用层：核心聚合与决策逻辑

pub mod alerts;
pub mod breakdown;
pub mod comparison;
pub mod export;
pub mod insight;
pub mod kpi;

pub use alerts::*;
pub use breakdown::*;
pub use comparison::*;
pub use export::*;
pub use insight::*;
pub use kpi::*;

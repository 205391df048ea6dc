//! common - 通用类型和工具库

pub mod math;
pub mod types;
pub mod window;

pub use math::*;
pub use types::*;
pub use window::*;

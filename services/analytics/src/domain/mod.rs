//! 领域层

pub mod intents;
pub mod model;
pub mod notification;
pub mod repositories;
pub mod rules;

pub use intents::*;
pub use model::*;
pub use notification::*;
pub use repositories::*;
pub use rules::*;

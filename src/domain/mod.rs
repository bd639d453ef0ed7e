//! 领域模型

pub mod status;
pub mod theme;

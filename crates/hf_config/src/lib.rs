// crates/hf_config/src/lib.rs

//! HydroFlux Config Layer (Layer 2)
//!
//! 配置层，提供与过程无关的运行选项。
//!
//! # 模块概览
//!
//! - [`options`]: ModelOptions 运行选项（时间步长、蒸散发竞争开关）
//! - [`evaporation`]: PET 方法选择与混合权重
//! - [`error`]: 配置错误类型
//!
//! # 层级架构
//!
//! ```text
//! Layer 3: hf_physics    ─> uses ModelOptions, PetMethod
//! Layer 2: hf_config     ─> ModelOptions, EvaporationOptions (本层)
//! Layer 1: hf_foundation
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod evaporation;
pub mod options;

/// 层级标识
pub const LAYER: u8 = 2;

// 重导出核心类型
pub use error::ConfigError;
pub use evaporation::{EvaporationOptions, PetBlend, PetMethod};
pub use options::ModelOptions;

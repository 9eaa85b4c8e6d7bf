// crates/hf_foundation/src/lib.rs

//! HydroFlux Foundation Layer
//!
//! 基础层，提供整个项目共享的基础抽象。
//!
//! # 模块概览
//!
//! - [`index`]: 强类型索引（隔室、成分）
//! - [`error`]: 统一错误类型
//! - [`validation`]: 组装期验证报告
//!
//! # 示例
//!
//! ```
//! use hf_foundation::{
//!     error::{HfError, HfResult},
//!     index::{compartment, CompartmentIndex},
//! };
//!
//! fn lookup(idx: Option<CompartmentIndex>) -> HfResult<CompartmentIndex> {
//!     idx.ok_or_else(|| HfError::missing_compartment("CanopyDrip", "Canopy"))
//! }
//!
//! assert!(lookup(Some(compartment(0))).is_ok());
//! assert!(lookup(None).is_err());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod index;
pub mod validation;

// 重导出常用类型
pub use error::{ErrorKind, HfError, HfResult};
pub use index::{CompartmentIndex, ConstituentIndex, Idx};
pub use validation::{ValidationError, ValidationReport, ValidationWarning};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{ErrorKind, HfError, HfResult};
    pub use crate::index::{compartment, constituent, CompartmentIndex, ConstituentIndex, Idx};
    pub use crate::validation::{ValidationError, ValidationReport, ValidationWarning};
    pub use crate::{ensure, require};
}

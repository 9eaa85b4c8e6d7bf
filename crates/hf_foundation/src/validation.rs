// crates/hf_foundation/src/validation.rs

//! 组装期验证工具
//!
//! 提供验证报告和错误/警告类型，用于模型组装阶段的一次性检查：
//! 参数完整性、单元属性范围等。运行期数值代码不使用本模块。
//!
//! # 示例
//!
//! ```
//! use hf_foundation::validation::{ValidationReport, ValidationError};
//!
//! let forest_coverage = 1.2f64;
//! let mut report = ValidationReport::new();
//! if forest_coverage > 1.0 {
//!     report.add_error(ValidationError::OutOfRange {
//!         field: "forest_coverage",
//!         unit_id: 0,
//!         value: forest_coverage,
//!         min: 0.0,
//!         max: 1.0,
//!     });
//! }
//! assert!(report.into_result().is_err());
//! ```

use crate::error::{HfError, HfResult};
use std::fmt;

/// 验证报告
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// 错误列表
    pub errors: Vec<ValidationError>,
    /// 警告列表
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    /// 创建空的验证报告
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加错误
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// 是否有错误
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 是否有警告
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// 错误数量
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// 警告数量
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// 是否通过（无错误）
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// 合并另一个报告
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// 转换为结果：有错误时返回 `HfError::Validation`
    ///
    /// 警告被丢弃，调用方需要时应在转换前读取。
    pub fn into_result(self) -> HfResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            let details: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
            Err(HfError::validation(details.join("; ")))
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "验证报告:")?;
        writeln!(f, "  错误: {} 个", self.error_count())?;
        writeln!(f, "  警告: {} 个", self.warning_count())?;

        if self.has_errors() {
            writeln!(f, "\n错误详情:")?;
            for (i, err) in self.errors.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, err)?;
            }
        }

        if self.has_warnings() {
            writeln!(f, "\n警告详情:")?;
            for (i, warn) in self.warnings.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, warn)?;
            }
        }

        Ok(())
    }
}

/// 验证错误类型
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// 非有限值
    NonFinite {
        /// 字段名称
        field: &'static str,
        /// 所在单元 ID
        unit_id: usize,
        /// 非有限的数值
        value: f64,
    },
    /// 数据超出范围
    OutOfRange {
        /// 字段名称
        field: &'static str,
        /// 所在单元 ID
        unit_id: usize,
        /// 实际值
        value: f64,
        /// 下界
        min: f64,
        /// 上界
        max: f64,
    },
    /// 缺少过程所需参数
    MissingParameter {
        /// 参数名
        name: String,
        /// 参数所属类别
        class: String,
        /// 需要该参数的过程
        process: &'static str,
    },
    /// 自定义错误
    Custom {
        /// 自定义消息
        message: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinite {
                field,
                unit_id,
                value,
            } => {
                write!(f, "单元{}: 字段{}={} (非有限值)", unit_id, field, value)
            }
            Self::OutOfRange {
                field,
                unit_id,
                value,
                min,
                max,
            } => {
                write!(
                    f,
                    "单元{}: 字段{}={} 超出范围[{}, {}]",
                    unit_id, field, value, min, max
                )
            }
            Self::MissingParameter {
                name,
                class,
                process,
            } => {
                write!(f, "{} 需要参数 {} ({}类)", process, name, class)
            }
            Self::Custom { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// 验证警告类型
#[derive(Debug, Clone)]
pub enum ValidationWarning {
    /// 低数值
    LowValue {
        /// 字段名称
        field: &'static str,
        /// 单元 ID
        unit_id: usize,
        /// 实际值
        value: f64,
        /// 阈值
        threshold: f64,
    },
    /// 自定义警告
    Custom {
        /// 自定义消息
        message: String,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowValue {
                field,
                unit_id,
                value,
                threshold,
            } => {
                write!(
                    f,
                    "单元{}: 字段{}={} 低于阈值{}",
                    unit_id, field, value, threshold
                )
            }
            Self::Custom { message } => write!(f, "{}", message),
        }
    }
}

// ============================================================================
// 验证辅助函数
// ============================================================================

/// 检查值是否有限
pub fn check_finite(
    report: &mut ValidationReport,
    field: &'static str,
    unit_id: usize,
    value: f64,
) -> bool {
    if !value.is_finite() {
        report.add_error(ValidationError::NonFinite {
            field,
            unit_id,
            value,
        });
        false
    } else {
        true
    }
}

/// 检查值是否在闭区间内（非有限值记为非有限错误）
pub fn check_range(
    report: &mut ValidationReport,
    field: &'static str,
    unit_id: usize,
    value: f64,
    min: f64,
    max: f64,
) -> bool {
    if !check_finite(report, field, unit_id, value) {
        return false;
    }
    if value < min || value > max {
        report.add_error(ValidationError::OutOfRange {
            field,
            unit_id,
            value,
            min,
            max,
        });
        false
    } else {
        true
    }
}

/// 检查值是否低于阈值并添加警告
pub fn warn_if_low(
    report: &mut ValidationReport,
    field: &'static str,
    unit_id: usize,
    value: f64,
    threshold: f64,
) -> bool {
    if value < threshold {
        report.add_warning(ValidationWarning::LowValue {
            field,
            unit_id,
            value,
            threshold,
        });
        true
    } else {
        false
    }
}

// ============================================================================
// 测试
// ============================================================================

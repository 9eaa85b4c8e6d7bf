// crates/hf_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `HfError` 枚举和 `HfResult` 类型别名，用于整个项目的错误处理。
//!
//! # 错误分类
//!
//! 1. **配置错误**: 过程连接与隔室类型不符、构造参数缺失、算法未定义。
//!    在模型组装阶段立即终止，不做部分恢复。
//! 2. **未实现标记**: 已声明但公式仍为桩的算法变体，与配置错误同等对待。
//! 3. **数据错误**: 输入超出范围、数组大小不匹配等。
//! 4. **IO 错误**: 配置文件读写失败。
//!
//! # 示例
//!
//! ```
//! use hf_foundation::error::{HfError, HfResult};
//!
//! fn read_config() -> HfResult<()> {
//!     Err(HfError::config("时间步长必须为正"))
//! }
//! assert!(read_config().unwrap_err().is_fatal());
//! ```

use thiserror::Error;

/// 统一结果类型
pub type HfResult<T> = Result<T, HfError>;

/// 错误大类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 配置错误（致命）
    Configuration,
    /// 功能未实现（致命）
    Unimplemented,
    /// 数据错误
    Data,
    /// IO 错误
    Io,
}

/// HydroFlux 错误类型
#[derive(Error, Debug)]
pub enum HfError {
    // ========================================================================
    // 配置相关错误
    // ========================================================================

    /// 配置错误
    #[error("配置错误: {message}")]
    Config {
        /// 具体错误信息
        message: String,
    },

    /// 过程连接与期望的隔室类型不符
    #[error("连接无效: {process} 第{slot}个连接期望 {expected}, 实际 {actual}")]
    InvalidConnection {
        /// 过程名称
        process: &'static str,
        /// 连接序号
        slot: usize,
        /// 期望的隔室描述
        expected: String,
        /// 实际的隔室描述
        actual: String,
    },

    /// 过程所需隔室未注册
    #[error("隔室不存在: {process} 需要 {kind}")]
    MissingCompartment {
        /// 过程名称
        process: &'static str,
        /// 隔室类型描述
        kind: String,
    },

    /// 算法选择器没有对应公式
    #[error("未定义的算法: {process} 不支持 {algorithm}")]
    UnknownAlgorithm {
        /// 过程名称
        process: &'static str,
        /// 算法名称
        algorithm: String,
    },

    /// 未知成分
    #[error("未知成分: {name}")]
    UnknownConstituent {
        /// 成分名称
        name: String,
    },

    /// 功能未实现
    #[error("功能未实现: {feature}")]
    NotImplemented {
        /// 未实现的功能描述
        feature: String,
    },

    // ========================================================================
    // 数据相关错误
    // ========================================================================

    /// 数据超出范围
    #[error("数据超出范围: {field}={value}, 期望范围=[{min}, {max}]")]
    OutOfRange {
        /// 字段名
        field: &'static str,
        /// 实际值
        value: f64,
        /// 最小允许值
        min: f64,
        /// 最大允许值
        max: f64,
    },

    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 验证失败
    #[error("验证失败: {0}")]
    Validation(String),

    /// 运行时数值错误
    #[error("运行时错误: {0}")]
    Runtime(String),

    // ========================================================================
    // IO 相关错误
    // ========================================================================

    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        #[source]
        /// 可选的底层 IO 错误
        source: Option<std::io::Error>,
    },

    /// 序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        /// 序列化失败原因
        message: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl HfError {
    /// 配置错误
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// 连接无效
    pub fn invalid_connection(
        process: &'static str,
        slot: usize,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidConnection {
            process,
            slot,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// 隔室不存在
    pub fn missing_compartment(process: &'static str, kind: impl Into<String>) -> Self {
        Self::MissingCompartment {
            process,
            kind: kind.into(),
        }
    }

    /// 算法未定义
    pub fn unknown_algorithm(process: &'static str, algorithm: impl Into<String>) -> Self {
        Self::UnknownAlgorithm {
            process,
            algorithm: algorithm.into(),
        }
    }

    /// 未知成分
    pub fn unknown_constituent(name: impl Into<String>) -> Self {
        Self::UnknownConstituent { name: name.into() }
    }

    /// 功能未实现
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }

    /// 数据超出范围
    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    /// 数组大小不匹配
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 验证失败
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// 运行时错误
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }

    /// IO 错误
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 序列化错误
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

// ========================================================================
// 分类
// ========================================================================

impl HfError {
    /// 错误大类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. }
            | Self::InvalidConnection { .. }
            | Self::MissingCompartment { .. }
            | Self::UnknownAlgorithm { .. }
            | Self::UnknownConstituent { .. } => ErrorKind::Configuration,
            Self::NotImplemented { .. } => ErrorKind::Unimplemented,
            Self::OutOfRange { .. }
            | Self::SizeMismatch { .. }
            | Self::Validation(_)
            | Self::Runtime(_) => ErrorKind::Data,
            Self::Io { .. } | Self::Serialization { .. } => ErrorKind::Io,
        }
    }

    /// 是否为致命错误（必须终止模型组装）
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::Unimplemented
        )
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl HfError {
    /// 检查数组大小是否匹配
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> HfResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 检查值是否在范围内
    #[inline]
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> HfResult<()> {
        if !(value >= min && value <= max) {
            Err(Self::out_of_range(field, value, min, max))
        } else {
            Ok(())
        }
    }
}

impl From<std::io::Error> for HfError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

// ========================================================================
// 宏
// ========================================================================

/// 条件不满足时提前返回错误
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}

/// 从 `Option` 取值，`None` 时提前返回错误
#[macro_export]
macro_rules! require {
    ($opt:expr, $err:expr) => {
        match $opt {
            Some(v) => v,
            None => return Err($err.into()),
        }
    };
}

// ========================================================================
// 测试
// ========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HfError::config("测试配置错误");
        assert!(err.to_string().contains("配置错误"));
    }

    #[test]
    fn test_invalid_connection_display() {
        let err = HfError::invalid_connection("CanopyEvaporation", 0, "Canopy", "Snow");
        let msg = err.to_string();
        assert!(msg.contains("CanopyEvaporation"));
        assert!(msg.contains("Canopy"));
        assert!(msg.contains("Snow"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(HfError::config("x").kind(), ErrorKind::Configuration);
        assert_eq!(
            HfError::missing_compartment("CanopyDrip", "Canopy").kind(),
            ErrorKind::Configuration
        );
        assert_eq!(HfError::not_implemented("x").kind(), ErrorKind::Unimplemented);
        assert_eq!(HfError::size_mismatch("x", 1, 2).kind(), ErrorKind::Data);
        assert_eq!(HfError::io("x").kind(), ErrorKind::Io);
    }

    #[test]
    fn test_fatal_classification() {
        assert!(HfError::unknown_algorithm("CanopyDrip", "Foo").is_fatal());
        assert!(HfError::not_implemented("sublimation").is_fatal());
        assert!(!HfError::out_of_range("pet", -1.0, 0.0, 10.0).is_fatal());
    }

    #[test]
    fn test_check_size() {
        assert!(HfError::check_size("rates", 2, 2).is_ok());
        assert!(HfError::check_size("rates", 2, 1).is_err());
    }

    #[test]
    fn test_check_range() {
        assert!(HfError::check_range("fc", 0.5, 0.0, 1.0).is_ok());
        assert!(HfError::check_range("fc", -0.1, 0.0, 1.0).is_err());
        assert!(HfError::check_range("fc", f64::NAN, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: HfError = io_err.into();
        assert!(matches!(err, HfError::Io { .. }));
    }

    #[test]
    fn test_ensure_macro() {
        fn check(value: f64) -> HfResult<()> {
            ensure!(value > 0.0, HfError::validation("时间步长必须为正"));
            Ok(())
        }

        assert!(check(1.0).is_ok());
        assert!(check(-1.0).is_err());
    }

    #[test]
    fn test_require_macro() {
        fn get_value(opt: Option<usize>) -> HfResult<usize> {
            let v = require!(opt, HfError::missing_compartment("CanopyDrip", "Canopy"));
            Ok(v)
        }

        assert_eq!(get_value(Some(3)).unwrap(), 3);
        assert!(get_value(None).is_err());
    }
}

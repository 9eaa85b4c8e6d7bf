// crates/hf_foundation/src/index.rs

//! 强类型索引系统
//!
//! 使用泛型 `Idx<T>` 区分隔室与成分的索引。
//!
//! # 设计目标
//!
//! 1. **类型安全**: 编译期区分不同类型的索引
//! 2. **零开销**: 与 u32 完全相同的内存布局
//! 3. **无哨兵值**: "不存在" 统一使用 `Option<Idx<T>>` 表达，
//!    不存在魔数索引
//!
//! # 示例
//!
//! ```
//! use hf_foundation::index::{CompartmentIndex, compartment};
//!
//! let idx = compartment(3);
//! assert_eq!(idx.as_usize(), 3);
//!
//! let trunk: Option<CompartmentIndex> = None;
//! assert!(trunk.is_none());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

// ============================================================================
// 标记类型 (Phantom Types)
// ============================================================================

/// 隔室（状态变量）索引标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompartmentTag;

/// 输运成分索引标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstituentTag;

// ============================================================================
// 泛型索引类型
// ============================================================================

/// 泛型强类型索引
///
/// 使用 Phantom Type `T` 区分不同类型的索引，避免误用。
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Idx<T> {
    index: u32,
    #[serde(skip)]
    _marker: PhantomData<fn() -> T>,
}

// 手动实现 Copy 和 Clone，因为 PhantomData<T> 的 Copy 需要 T: Copy
impl<T> Copy for Idx<T> {}

impl<T> Clone for Idx<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Idx<T> {
    /// 创建新索引
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// 从 usize 创建
    #[inline]
    pub fn from_usize(index: usize) -> Self {
        debug_assert!(index < u32::MAX as usize, "索引超出 u32 范围");
        Self::new(index as u32)
    }

    /// 获取索引值
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// 获取索引值（usize）
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.index as usize
    }
}

// ============================================================================
// Trait 实现
// ============================================================================

impl<T> PartialEq for Idx<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Idx<T> {}

impl<T> PartialOrd for Idx<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Idx<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.index.cmp(&other.index)
    }
}

impl<T> Hash for Idx<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Idx<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Idx({})", self.index)
    }
}

impl<T> fmt::Display for Idx<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index)
    }
}

impl<T> From<usize> for Idx<T> {
    #[inline]
    fn from(index: usize) -> Self {
        Self::from_usize(index)
    }
}

impl<T> From<Idx<T>> for usize {
    #[inline]
    fn from(idx: Idx<T>) -> usize {
        idx.as_usize()
    }
}

// ============================================================================
// 类型别名
// ============================================================================

/// 隔室（状态变量）索引
pub type CompartmentIndex = Idx<CompartmentTag>;

/// 输运成分索引
pub type ConstituentIndex = Idx<ConstituentTag>;

// ============================================================================
// 便捷函数
// ============================================================================

/// 创建隔室索引
#[inline]
pub const fn compartment(index: u32) -> CompartmentIndex {
    CompartmentIndex::new(index)
}

/// 创建成分索引
#[inline]
pub const fn constituent(index: u32) -> ConstituentIndex {
    ConstituentIndex::new(index)
}

// ============================================================================
// 测试
// ============================================================================

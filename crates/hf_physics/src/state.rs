// crates/hf_physics/src/state.rs

//! 隔室与状态变量
//!
//! 单元内每个储量隔室（冠层截留、冠层积雪、大气汇、累计蒸散发等）
//! 对应状态向量中的一个位置。索引在模型组装时由 [`StateVarRegistry`]
//! 一次性解析，运行期只使用强类型的 [`CompartmentIndex`]。
//!
//! 不存在的隔室用 `None` 表示，过程在依赖可选隔室（如树干）的公式前
//! 必须显式检查。

use std::collections::HashMap;
use std::fmt;
use std::ops::{Index, IndexMut};

use hf_foundation::error::{HfError, HfResult};
use hf_foundation::index::CompartmentIndex;
use serde::{Deserialize, Serialize};

// ============================================================
// 隔室类型
// ============================================================

/// 隔室语义类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompartmentKind {
    /// 冠层截留雨水
    Canopy,
    /// 冠层截留积雪
    CanopySnow,
    /// 树干截留
    Trunk,
    /// 大气（蒸发汇）
    Atmosphere,
    /// 本时间步累计实际蒸散发
    Aet,
    /// 地表积水
    Ponded,
    /// 洼地蓄水
    Depression,
    /// 地表水
    SurfaceWater,
    /// 地面积雪
    Snow,
    /// 土壤水（分层）
    SoilMoisture,
    /// 输运成分质量（按成分与水隔室分层）
    Constituent,
}

impl CompartmentKind {
    /// 类型名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Canopy => "Canopy",
            Self::CanopySnow => "CanopySnow",
            Self::Trunk => "Trunk",
            Self::Atmosphere => "Atmosphere",
            Self::Aet => "Aet",
            Self::Ponded => "Ponded",
            Self::Depression => "Depression",
            Self::SurfaceWater => "SurfaceWater",
            Self::Snow => "Snow",
            Self::SoilMoisture => "SoilMoisture",
            Self::Constituent => "Constituent",
        }
    }

    /// 是否为分层隔室（必须指定层号）
    pub fn is_multilevel(&self) -> bool {
        matches!(self, Self::SoilMoisture | Self::Constituent)
    }

    /// 是否为可携带溶质的水储量
    pub fn is_water_storage(&self) -> bool {
        matches!(
            self,
            Self::Canopy
                | Self::Trunk
                | Self::Ponded
                | Self::Depression
                | Self::SurfaceWater
                | Self::SoilMoisture
        )
    }
}

impl fmt::Display for CompartmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 状态变量描述：类型 + 可选层号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateVarSpec {
    /// 隔室类型
    pub kind: CompartmentKind,
    /// 层号，`None` 表示单层隔室
    pub level: Option<u16>,
}

impl StateVarSpec {
    /// 单层隔室
    pub const fn single(kind: CompartmentKind) -> Self {
        Self { kind, level: None }
    }

    /// 分层隔室的指定层
    pub const fn at_level(kind: CompartmentKind, level: u16) -> Self {
        Self {
            kind,
            level: Some(level),
        }
    }
}

impl fmt::Display for StateVarSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Some(level) => write!(f, "{}[{}]", self.kind, level),
            None => write!(f, "{}", self.kind),
        }
    }
}

// ============================================================
// 状态变量注册表
// ============================================================

/// 状态变量注册表
///
/// 每个模型构建一次，显式传入过程的初始化和每个时间步的调用。
/// 注册顺序决定状态向量中的位置，重复注册返回已有索引。
#[derive(Debug, Clone, Default)]
pub struct StateVarRegistry {
    specs: Vec<StateVarSpec>,
    lookup: HashMap<StateVarSpec, CompartmentIndex>,
}

impl StateVarRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册状态变量
    ///
    /// 分层类型必须给出层号，单层类型不能给出层号。
    pub fn register(&mut self, spec: StateVarSpec) -> HfResult<CompartmentIndex> {
        if spec.kind.is_multilevel() != spec.level.is_some() {
            return Err(HfError::config(format!(
                "状态变量 {} 的层号与类型不符",
                spec
            )));
        }
        if let Some(&idx) = self.lookup.get(&spec) {
            return Ok(idx);
        }
        let idx = CompartmentIndex::from_usize(self.specs.len());
        self.specs.push(spec);
        self.lookup.insert(spec, idx);
        Ok(idx)
    }

    /// 批量注册
    pub fn register_all<I>(&mut self, specs: I) -> HfResult<()>
    where
        I: IntoIterator<Item = StateVarSpec>,
    {
        for spec in specs {
            self.register(spec)?;
        }
        Ok(())
    }

    /// 解析 (类型, 层号) 到索引
    pub fn index_of(&self, kind: CompartmentKind, level: Option<u16>) -> Option<CompartmentIndex> {
        self.lookup.get(&StateVarSpec { kind, level }).copied()
    }

    /// 解析单层隔室
    #[inline]
    pub fn index(&self, kind: CompartmentKind) -> Option<CompartmentIndex> {
        self.index_of(kind, None)
    }

    /// 是否注册了该单层隔室
    #[inline]
    pub fn contains(&self, kind: CompartmentKind) -> bool {
        self.index(kind).is_some()
    }

    /// 索引对应的描述
    pub fn spec(&self, idx: CompartmentIndex) -> Option<StateVarSpec> {
        self.specs.get(idx.as_usize()).copied()
    }

    /// 索引对应的类型
    pub fn kind_of(&self, idx: CompartmentIndex) -> Option<CompartmentKind> {
        self.spec(idx).map(|s| s.kind)
    }

    /// 状态变量数量
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// 按注册顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (CompartmentIndex, StateVarSpec)> + '_ {
        self.specs
            .iter()
            .enumerate()
            .map(|(i, s)| (CompartmentIndex::from_usize(i), *s))
    }

    /// 期望某索引为指定类型，否则返回连接错误
    pub fn expect_kind(
        &self,
        process: &'static str,
        slot: usize,
        idx: CompartmentIndex,
        expected: CompartmentKind,
    ) -> HfResult<()> {
        match self.kind_of(idx) {
            Some(kind) if kind == expected => Ok(()),
            Some(kind) => Err(HfError::invalid_connection(
                process,
                slot,
                expected.name(),
                kind.name(),
            )),
            None => Err(HfError::invalid_connection(
                process,
                slot,
                expected.name(),
                format!("未注册的索引 {}", idx),
            )),
        }
    }
}

// ============================================================
// 状态向量
// ============================================================

/// 单元状态向量，每个已注册隔室一个值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateVector {
    values: Vec<f64>,
}

impl StateVector {
    /// 按注册表大小创建全零状态
    pub fn zeros(registry: &StateVarRegistry) -> Self {
        Self {
            values: vec![0.0; registry.len()],
        }
    }

    /// 从已有数值创建
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// 检查长度与注册表一致
    pub fn check_len(&self, registry: &StateVarRegistry) -> HfResult<()> {
        HfError::check_size("StateVector", registry.len(), self.values.len())
    }

    /// 原始值
    #[inline]
    pub fn get(&self, idx: CompartmentIndex) -> f64 {
        self.values[idx.as_usize()]
    }

    /// 设置值
    #[inline]
    pub fn set(&mut self, idx: CompartmentIndex, value: f64) {
        self.values[idx.as_usize()] = value;
    }

    /// 可用储量：负值（上游数值漂移）按零处理
    #[inline]
    pub fn storage(&self, idx: CompartmentIndex) -> f64 {
        let value = self.get(idx);
        if value < 0.0 {
            log::trace!("隔室 {} 储量为负 ({:e})，按零处理", idx, value);
            0.0
        } else {
            value
        }
    }

    /// 长度
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 切片视图
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// 所有值之和
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

impl Index<CompartmentIndex> for StateVector {
    type Output = f64;

    #[inline]
    fn index(&self, idx: CompartmentIndex) -> &f64 {
        &self.values[idx.as_usize()]
    }
}

impl IndexMut<CompartmentIndex> for StateVector {
    #[inline]
    fn index_mut(&mut self, idx: CompartmentIndex) -> &mut f64 {
        &mut self.values[idx.as_usize()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_dedup() {
        let mut reg = StateVarRegistry::new();
        let a = reg.register(StateVarSpec::single(CompartmentKind::Canopy)).unwrap();
        let b = reg.register(StateVarSpec::single(CompartmentKind::Atmosphere)).unwrap();
        let c = reg.register(StateVarSpec::single(CompartmentKind::Canopy)).unwrap();
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_level_must_match_kind() {
        let mut reg = StateVarRegistry::new();
        assert!(reg.register(StateVarSpec::single(CompartmentKind::SoilMoisture)).is_err());
        assert!(reg.register(StateVarSpec::at_level(CompartmentKind::Canopy, 0)).is_err());
        assert!(reg.register(StateVarSpec::at_level(CompartmentKind::SoilMoisture, 1)).is_ok());
    }

    #[test]
    fn test_lookup_absent() {
        let mut reg = StateVarRegistry::new();
        reg.register(StateVarSpec::single(CompartmentKind::Canopy)).unwrap();
        assert!(reg.index(CompartmentKind::Trunk).is_none());
        assert!(reg.index_of(CompartmentKind::SoilMoisture, Some(0)).is_none());
        assert_eq!(reg.kind_of(reg.index(CompartmentKind::Canopy).unwrap()), Some(CompartmentKind::Canopy));
    }

    #[test]
    fn test_expect_kind() {
        let mut reg = StateVarRegistry::new();
        let can = reg.register(StateVarSpec::single(CompartmentKind::Canopy)).unwrap();
        assert!(reg.expect_kind("Test", 0, can, CompartmentKind::Canopy).is_ok());
        let err = reg.expect_kind("Test", 0, can, CompartmentKind::Snow).unwrap_err();
        assert!(err.is_fatal());
        assert!(reg
            .expect_kind("Test", 0, CompartmentIndex::new(9), CompartmentKind::Canopy)
            .is_err());
    }

    #[test]
    fn test_storage_clamps_negative() {
        let mut reg = StateVarRegistry::new();
        let can = reg.register(StateVarSpec::single(CompartmentKind::Canopy)).unwrap();
        let mut state = StateVector::zeros(&reg);
        state[can] = -0.3;
        assert_eq!(state.get(can), -0.3);
        assert_eq!(state.storage(can), 0.0);
        state.set(can, 1.5);
        assert_eq!(state.storage(can), 1.5);
        assert!(state.check_len(&reg).is_ok());
    }

    #[test]
    fn test_kind_classification() {
        assert!(CompartmentKind::Constituent.is_multilevel());
        assert!(!CompartmentKind::Canopy.is_multilevel());
        assert!(CompartmentKind::Ponded.is_water_storage());
        assert!(!CompartmentKind::Atmosphere.is_water_storage());
        assert_eq!(
            StateVarSpec::at_level(CompartmentKind::SoilMoisture, 2).to_string(),
            "SoilMoisture[2]"
        );
    }
}

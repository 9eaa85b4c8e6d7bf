// crates/hf_physics/src/processes/traits.rs

//! 水文过程 Trait 定义
//!
//! 定义过程的核心接口和数据结构：连接描述、速率向量、时间步上下文。
//!
//! # 调用约定
//!
//! 每个时间步、每个单元、每个过程：
//!
//! 1. [`HydroProcess::rates_of_change`] 计算未约束速率
//! 2. [`HydroProcess::apply_constraints`] 对同一个速率向量做约束
//!
//! 两步都只写入速率向量，状态由调用方在约束之后统一提交。

use std::collections::HashMap;
use std::fmt;
use std::ops::{Index, IndexMut};

use hf_config::ModelOptions;
use hf_foundation::error::HfResult;
use hf_foundation::index::CompartmentIndex;
use serde::{Deserialize, Serialize};

use crate::ledger::EtLedger;
use crate::state::{StateVarRegistry, StateVector};
use crate::unit::HydroUnit;

// ============================================================
// 连接
// ============================================================

/// 一条质量转移连接：源隔室 -> 目标隔室
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    /// 源隔室
    pub from: CompartmentIndex,
    /// 目标隔室
    pub to: CompartmentIndex,
}

impl Connection {
    /// 创建连接
    #[inline]
    pub const fn new(from: CompartmentIndex, to: CompartmentIndex) -> Self {
        Self { from, to }
    }

    /// 是否为自环（只累加到目标，不从源扣除）
    #[inline]
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

/// 过程的有序连接列表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connectivity {
    connections: Vec<Connection>,
}

impl Connectivity {
    /// 空连接表
    pub fn new() -> Self {
        Self::default()
    }

    /// 由连接列表创建
    pub fn from_connections(connections: Vec<Connection>) -> Self {
        Self { connections }
    }

    /// 追加连接
    pub fn push(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    /// 清空
    pub fn clear(&mut self) {
        self.connections.clear();
    }

    /// 连接数
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// 第 i 条连接
    pub fn get(&self, i: usize) -> Option<&Connection> {
        self.connections.get(i)
    }

    /// 遍历
    pub fn iter(&self) -> std::slice::Iter<'_, Connection> {
        self.connections.iter()
    }

    /// 切片视图
    pub fn as_slice(&self) -> &[Connection] {
        &self.connections
    }
}

// ============================================================
// 速率向量
// ============================================================

/// 速率向量，每条连接一个值 [mm/d]
///
/// 由调用方按过程的连接数分配并拥有。
#[derive(Debug, Clone, PartialEq)]
pub struct RateVector {
    rates: Vec<f64>,
}

impl RateVector {
    /// 指定长度的全零速率
    pub fn zeros(len: usize) -> Self {
        Self {
            rates: vec![0.0; len],
        }
    }

    /// 按过程的连接数分配
    pub fn for_process<P: HydroProcess + ?Sized>(process: &P) -> Self {
        Self::zeros(process.connectivity().len())
    }

    /// 置零
    pub fn reset(&mut self) {
        self.rates.iter_mut().for_each(|r| *r = 0.0);
    }

    /// 长度
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// 切片视图
    pub fn as_slice(&self) -> &[f64] {
        &self.rates
    }
}

impl Index<usize> for RateVector {
    type Output = f64;

    #[inline]
    fn index(&self, i: usize) -> &f64 {
        &self.rates[i]
    }
}

impl IndexMut<usize> for RateVector {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.rates[i]
    }
}

// ============================================================
// 通量快照
// ============================================================

/// 本时间步已提交的水通量 [mm/d]
///
/// 由过程序列在每个过程提交后写入，供对流过程读取。
#[derive(Debug, Clone, Default)]
pub struct FluxSnapshot {
    fluxes: HashMap<(CompartmentIndex, CompartmentIndex), f64>,
}

impl FluxSnapshot {
    /// 空快照
    pub fn new() -> Self {
        Self::default()
    }

    /// 累加一条通量
    pub fn record(&mut self, from: CompartmentIndex, to: CompartmentIndex, rate: f64) {
        *self.fluxes.entry((from, to)).or_insert(0.0) += rate;
    }

    /// 读取通量，不存在为零
    pub fn rate(&self, from: CompartmentIndex, to: CompartmentIndex) -> f64 {
        self.fluxes.get(&(from, to)).copied().unwrap_or(0.0)
    }

    /// 隔室本步的净流出通量（流出减流入）
    pub fn net_outflow(&self, idx: CompartmentIndex) -> f64 {
        self.fluxes
            .iter()
            .map(|(&(from, to), &rate)| {
                if from == to {
                    0.0
                } else if from == idx {
                    rate
                } else if to == idx {
                    -rate
                } else {
                    0.0
                }
            })
            .sum()
    }

    /// 清空
    pub fn clear(&mut self) {
        self.fluxes.clear();
    }

    /// 记录数
    pub fn len(&self) -> usize {
        self.fluxes.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.fluxes.is_empty()
    }
}

// ============================================================
// 时间步上下文
// ============================================================

/// 时间步上下文
///
/// 替代全局模型访问：注册表、选项、账本都显式传入。
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// 当前模拟时间 [d]
    pub time: f64,
    /// 运行选项
    pub options: &'a ModelOptions,
    /// 状态变量注册表
    pub registry: &'a StateVarRegistry,
    /// 本步蒸散发账本（只读，写入由过程序列完成）
    pub ledger: &'a EtLedger,
    /// 本步已提交的水通量
    pub fluxes: &'a FluxSnapshot,
}

impl<'a> StepContext<'a> {
    /// 创建上下文
    pub fn new(
        time: f64,
        options: &'a ModelOptions,
        registry: &'a StateVarRegistry,
        ledger: &'a EtLedger,
        fluxes: &'a FluxSnapshot,
    ) -> Self {
        Self {
            time,
            options,
            registry,
            ledger,
            fluxes,
        }
    }

    /// 时间步长 [d]
    #[inline]
    pub fn dt(&self) -> f64 {
        self.options.timestep
    }
}

// ============================================================
// 参数声明
// ============================================================

/// 参数所属类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamClass {
    /// 土壤类
    Soil,
    /// 植被类
    Vegetation,
    /// 土地利用类
    LandUse,
    /// 地形类
    Terrain,
    /// 全局参数
    Global,
}

impl ParamClass {
    /// 类别名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Soil => "Soil",
            Self::Vegetation => "Vegetation",
            Self::LandUse => "LandUse",
            Self::Terrain => "Terrain",
            Self::Global => "Global",
        }
    }
}

impl fmt::Display for ParamClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 过程所需参数
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterSpec {
    /// 参数名
    pub name: String,
    /// 所属类别
    pub class: ParamClass,
}

impl ParameterSpec {
    /// 创建参数声明
    pub fn new(name: impl Into<String>, class: ParamClass) -> Self {
        Self {
            name: name.into(),
            class,
        }
    }
}

// ============================================================
// 过程 Trait
// ============================================================

/// 过程类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    /// 冠层蒸发
    CanopyEvaporation,
    /// 冠层积雪升华
    CanopySublimation,
    /// 冠层滴落
    CanopyDrip,
    /// 成分对流
    Advection,
}

impl ProcessKind {
    /// 类别名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::CanopyEvaporation => "CanopyEvaporation",
            Self::CanopySublimation => "CanopySublimation",
            Self::CanopyDrip => "CanopyDrip",
            Self::Advection => "Advection",
        }
    }
}

/// 水文过程 Trait
pub trait HydroProcess: Send + Sync {
    /// 过程类别
    fn kind(&self) -> ProcessKind;

    /// 过程名称
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// 连接描述
    fn connectivity(&self) -> &Connectivity;

    /// 承载蒸散发账本写入的连接序号
    fn et_slot(&self) -> Option<usize> {
        None
    }

    /// 检查连接的隔室类型
    ///
    /// 必须幂等：同一注册表重复调用得到相同连接，且不再失败。
    fn initialize(&mut self, registry: &StateVarRegistry) -> HfResult<()>;

    /// 计算未约束速率
    fn rates_of_change(
        &self,
        state: &StateVector,
        unit: &HydroUnit,
        ctx: &StepContext<'_>,
        rates: &mut RateVector,
    ) -> HfResult<()>;

    /// 按储量可用性和符号约束修正速率
    fn apply_constraints(
        &self,
        state: &StateVector,
        unit: &HydroUnit,
        ctx: &StepContext<'_>,
        rates: &mut RateVector,
    );

    /// 过程所需参数
    fn participating_params(&self) -> Vec<ParameterSpec>;
}

// ============================================================
// 辅助函数
// ============================================================

/// 过程辅助函数
pub struct ProcessHelpers;

impl ProcessHelpers {
    /// 冠层类过程是否作用于该单元
    #[inline]
    pub fn supports_unit(unit: &HydroUnit) -> bool {
        unit.unit_type.supports_canopy()
    }

    /// 将出流速率限制在 [0, storage/dt]
    #[inline]
    pub fn clamp_outflow(rate: f64, storage: f64, dt: f64) -> f64 {
        rate.max(0.0).min(storage.max(0.0) / dt)
    }

    /// max(x, 0)
    #[inline]
    pub fn thresh_positive(x: f64) -> f64 {
        x.max(0.0)
    }

    /// min(a, b)
    #[inline]
    pub fn thresh_min(a: f64, b: f64) -> f64 {
        a.min(b)
    }

    /// 扣除本步已消耗量后剩余的 PET [mm/d]
    ///
    /// 关闭竞争时返回完整 PET。
    #[inline]
    pub fn remaining_pet(pet: f64, ledger: &EtLedger, options: &ModelOptions) -> f64 {
        let pet = pet.max(0.0);
        if options.suppress_competitive_et {
            pet
        } else {
            (pet - ledger.consumed_rate(options.timestep)).max(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hf_foundation::index::compartment;

    #[test]
    fn test_clamp_outflow() {
        assert_eq!(ProcessHelpers::clamp_outflow(5.0, 2.0, 1.0), 2.0);
        assert_eq!(ProcessHelpers::clamp_outflow(-1.0, 2.0, 1.0), 0.0);
        assert_eq!(ProcessHelpers::clamp_outflow(1.0, -2.0, 1.0), 0.0);
        assert_eq!(ProcessHelpers::clamp_outflow(3.0, 2.0, 0.5), 3.0);
    }

    #[test]
    fn test_remaining_pet() {
        let mut ledger = EtLedger::new();
        let mut options = ModelOptions::with_timestep(1.0);
        ledger.record("a", 1.5, 1.0);
        assert!((ProcessHelpers::remaining_pet(4.0, &ledger, &options) - 2.5).abs() < 1e-12);
        assert_eq!(ProcessHelpers::remaining_pet(1.0, &ledger, &options), 0.0);
        assert_eq!(ProcessHelpers::remaining_pet(-2.0, &EtLedger::new(), &options), 0.0);

        options.suppress_competitive_et = true;
        assert_eq!(ProcessHelpers::remaining_pet(4.0, &ledger, &options), 4.0);
    }

    #[test]
    fn test_flux_snapshot() {
        let mut fluxes = FluxSnapshot::new();
        fluxes.record(compartment(0), compartment(1), 1.0);
        fluxes.record(compartment(0), compartment(1), 0.5);
        assert_eq!(fluxes.rate(compartment(0), compartment(1)), 1.5);
        assert_eq!(fluxes.rate(compartment(1), compartment(0)), 0.0);
        fluxes.record(compartment(2), compartment(0), 0.25);
        fluxes.record(compartment(3), compartment(3), 9.0);
        assert!((fluxes.net_outflow(compartment(0)) - 1.25).abs() < 1e-12);
        assert!((fluxes.net_outflow(compartment(1)) + 1.5).abs() < 1e-12);
        assert_eq!(fluxes.net_outflow(compartment(3)), 0.0);
        fluxes.clear();
        assert!(fluxes.is_empty());
    }

    #[test]
    fn test_rate_vector() {
        let mut rates = RateVector::zeros(2);
        rates[1] = 3.0;
        assert_eq!(rates.as_slice(), &[0.0, 3.0]);
        rates.reset();
        assert_eq!(rates.as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn test_self_loop() {
        assert!(Connection::new(compartment(2), compartment(2)).is_self_loop());
        assert!(!Connection::new(compartment(1), compartment(2)).is_self_loop());
    }
}

// crates/hf_physics/src/processes/canopy_evaporation.rs

//! 冠层截留蒸发
//!
//! 将冠层截留水转移到大气，同时在蒸散发账本中记录消耗。
//!
//! # 连接
//!
//! ```text
//! [0] Canopy -> Atmosphere   蒸发量
//! [1] Aet    -> Aet          账本写入（自环）
//! ```
//!
//! # 算法
//!
//! - Rutter: 与冠层饱和度成正比
//!   `rate = (1 - Ft) · Fc · PET · stor / (cap · Fc)`，
//!   stor 先限制在 `[0, cap · Fc]`，未建模树干时 Ft = 0
//! - Maximum: `rate = Fc · PET`
//! - All: 截留水在一个时间步内全部蒸发 `rate = stor / dt`
//!
//! PET 为扣除本步已消耗量后的剩余预算（除非关闭竞争）。

use hf_foundation::error::{HfError, HfResult};
use hf_foundation::index::CompartmentIndex;
use serde::{Deserialize, Serialize};

use super::traits::{
    Connection, Connectivity, HydroProcess, ParamClass, ParameterSpec, ProcessHelpers,
    ProcessKind, RateVector, StepContext,
};
use crate::state::{CompartmentKind, StateVarRegistry, StateVarSpec, StateVector};
use crate::unit::HydroUnit;

const NAME: &str = "CanopyEvaporation";

/// 冠层蒸发算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaporationAlgorithm {
    /// Rutter 概念模型
    Rutter,
    /// 按 PET 满速蒸发
    Maximum,
    /// 一步蒸发全部截留
    All,
}

impl EvaporationAlgorithm {
    /// 算法名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rutter => "Rutter",
            Self::Maximum => "Maximum",
            Self::All => "All",
        }
    }

    /// 所需参数
    pub fn participating_params(&self) -> Vec<ParameterSpec> {
        match self {
            Self::Rutter => vec![
                ParameterSpec::new("FOREST_COVERAGE", ParamClass::LandUse),
                ParameterSpec::new("MAX_CAPACITY", ParamClass::Vegetation),
                ParameterSpec::new("TRUNK_FRACTION", ParamClass::Vegetation),
            ],
            Self::Maximum => vec![ParameterSpec::new("FOREST_COVERAGE", ParamClass::LandUse)],
            Self::All => Vec::new(),
        }
    }

    /// 涉及的状态变量（与算法无关）
    pub fn participating_state_vars(&self) -> Vec<StateVarSpec> {
        vec![
            StateVarSpec::single(CompartmentKind::Canopy),
            StateVarSpec::single(CompartmentKind::Atmosphere),
            StateVarSpec::single(CompartmentKind::Aet),
        ]
    }
}

/// 冠层蒸发过程
#[derive(Debug, Clone)]
pub struct CanopyEvaporation {
    algorithm: EvaporationAlgorithm,
    connectivity: Connectivity,
}

impl CanopyEvaporation {
    /// 按注册表解析连接并创建
    pub fn new(algorithm: EvaporationAlgorithm, registry: &StateVarRegistry) -> HfResult<Self> {
        let canopy = lookup(registry, CompartmentKind::Canopy)?;
        let atmosphere = lookup(registry, CompartmentKind::Atmosphere)?;
        let aet = lookup(registry, CompartmentKind::Aet)?;
        Ok(Self::with_connectivity(
            algorithm,
            Connectivity::from_connections(vec![
                Connection::new(canopy, atmosphere),
                Connection::new(aet, aet),
            ]),
        ))
    }

    /// 使用给定连接创建，连接类型在 `initialize` 中检查
    pub(crate) fn with_connectivity(
        algorithm: EvaporationAlgorithm,
        connectivity: Connectivity,
    ) -> Self {
        Self {
            algorithm,
            connectivity,
        }
    }

    /// 当前算法
    pub fn algorithm(&self) -> EvaporationAlgorithm {
        self.algorithm
    }

    fn canopy(&self) -> CompartmentIndex {
        self.connectivity.as_slice()[0].from
    }

    /// 未约束蒸发速率 [mm/d]
    fn unconstrained_rate(&self, state: &StateVector, unit: &HydroUnit, ctx: &StepContext<'_>) -> f64 {
        let fc = unit.forest_coverage();
        let pet = ProcessHelpers::remaining_pet(unit.forcing.pet, ctx.ledger, ctx.options);

        match self.algorithm {
            EvaporationAlgorithm::Rutter => {
                let max_storage = unit.canopy_capacity() * fc;
                if max_storage <= 0.0 {
                    return 0.0;
                }
                let storage = state.storage(self.canopy()).min(max_storage);
                let trunk_fraction = if ctx.registry.contains(CompartmentKind::Trunk) {
                    unit.vegetation.trunk_fraction
                } else {
                    0.0
                };
                (1.0 - trunk_fraction) * fc * pet * (storage / max_storage)
            }
            EvaporationAlgorithm::Maximum => fc * pet,
            EvaporationAlgorithm::All => state.storage(self.canopy()) / ctx.dt(),
        }
    }
}

fn lookup(registry: &StateVarRegistry, kind: CompartmentKind) -> HfResult<CompartmentIndex> {
    registry
        .index(kind)
        .ok_or_else(|| HfError::missing_compartment(NAME, kind.name()))
}

impl HydroProcess for CanopyEvaporation {
    fn kind(&self) -> ProcessKind {
        ProcessKind::CanopyEvaporation
    }

    fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    fn et_slot(&self) -> Option<usize> {
        Some(1)
    }

    fn initialize(&mut self, registry: &StateVarRegistry) -> HfResult<()> {
        HfError::check_size("CanopyEvaporation connections", 2, self.connectivity.len())?;
        let c = self.connectivity.as_slice();
        registry.expect_kind(NAME, 0, c[0].from, CompartmentKind::Canopy)?;
        registry.expect_kind(NAME, 0, c[0].to, CompartmentKind::Atmosphere)?;
        registry.expect_kind(NAME, 1, c[1].from, CompartmentKind::Aet)?;
        if !c[1].is_self_loop() {
            return Err(HfError::invalid_connection(NAME, 1, "Aet -> Aet", "非自环连接"));
        }
        log::debug!("{} ({}) 初始化完成", NAME, self.algorithm.name());
        Ok(())
    }

    fn rates_of_change(
        &self,
        state: &StateVector,
        unit: &HydroUnit,
        ctx: &StepContext<'_>,
        rates: &mut RateVector,
    ) -> HfResult<()> {
        HfError::check_size("CanopyEvaporation connections", 2, self.connectivity.len())?;
        HfError::check_size("RateVector", self.connectivity.len(), rates.len())?;
        rates.reset();

        if !ProcessHelpers::supports_unit(unit) || unit.forest_coverage() == 0.0 {
            return Ok(());
        }

        let rate = self.unconstrained_rate(state, unit, ctx);
        rates[0] = rate;
        rates[1] = rate;
        log::trace!("{} 单元{}: rate={:.6} mm/d", NAME, unit.id, rate);
        Ok(())
    }

    fn apply_constraints(
        &self,
        state: &StateVector,
        unit: &HydroUnit,
        ctx: &StepContext<'_>,
        rates: &mut RateVector,
    ) {
        if !ProcessHelpers::supports_unit(unit) || self.connectivity.len() != 2 {
            return;
        }
        let old = rates[0];
        rates[0] = ProcessHelpers::clamp_outflow(old, state.storage(self.canopy()), ctx.dt());
        rates[1] -= old - rates[0];
    }

    fn participating_params(&self) -> Vec<ParameterSpec> {
        self.algorithm.participating_params()
    }
}

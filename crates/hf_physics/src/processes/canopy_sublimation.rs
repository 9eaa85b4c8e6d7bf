// crates/hf_physics/src/processes/canopy_sublimation.rs

//! 冠层积雪升华
//!
//! 与冠层蒸发相同的适用条件和账本读写方式，源隔室为冠层积雪。
//!
//! 风驱动变体（Sverdrup、Kuzmin 等）需要把观测风速换算到冠层高度，
//! 该换算尚未确定，这些变体在初始化和计算时都返回未实现错误，
//! 不会退回到其他公式。

use std::fmt;
use std::sync::Arc;

use hf_foundation::error::{HfError, HfResult};
use hf_foundation::index::CompartmentIndex;
use serde::{Deserialize, Serialize};

use super::traits::{
    Connection, Connectivity, HydroProcess, ParamClass, ParameterSpec, ProcessHelpers,
    ProcessKind, RateVector, StepContext,
};
use crate::state::{CompartmentKind, StateVarRegistry, StateVarSpec, StateVector};
use crate::unit::HydroUnit;

const NAME: &str = "CanopySublimation";
const WIND_ADJUSTMENT: &str = "canopy sublimation wind adjustment";

/// 冠层升华算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SublimationAlgorithm {
    /// 按 PET 满速升华
    Maximum,
    /// 一步升华全部积雪
    All,
    /// Sverdrup 风驱动
    Sverdrup,
    /// Kuzmin 风驱动
    Kuzmin,
    /// Central Sierra 风驱动
    CentralSierra,
    /// PBSM 风驱动
    Psbm,
    /// Williams 风驱动
    Williams,
}

impl SublimationAlgorithm {
    /// 算法名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Maximum => "Maximum",
            Self::All => "All",
            Self::Sverdrup => "Sverdrup",
            Self::Kuzmin => "Kuzmin",
            Self::CentralSierra => "CentralSierra",
            Self::Psbm => "Psbm",
            Self::Williams => "Williams",
        }
    }

    /// 是否依赖冠层高度风速
    pub fn is_wind_driven(&self) -> bool {
        !matches!(self, Self::Maximum | Self::All)
    }

    /// 所需参数
    pub fn participating_params(&self) -> Vec<ParameterSpec> {
        match self {
            Self::Maximum => vec![ParameterSpec::new("FOREST_COVERAGE", ParamClass::LandUse)],
            Self::Sverdrup => vec![ParameterSpec::new("SNOW_ROUGHNESS", ParamClass::Global)],
            _ => Vec::new(),
        }
    }

    /// 涉及的状态变量
    pub fn participating_state_vars(&self) -> Vec<StateVarSpec> {
        vec![
            StateVarSpec::single(CompartmentKind::CanopySnow),
            StateVarSpec::single(CompartmentKind::Atmosphere),
            StateVarSpec::single(CompartmentKind::Aet),
        ]
    }
}

/// 空气动力学升华公式
///
/// 由外部提供，输入为冠层高度处风速 [m/s]，返回单位覆盖面积的升华速率 [mm/d]。
/// 本过程只负责森林覆盖率缩放。
pub trait SublimationFormula: Send + Sync {
    /// 升华速率 [mm/d]
    fn sublimation_rate(
        &self,
        algorithm: SublimationAlgorithm,
        state: &StateVector,
        unit: &HydroUnit,
        wind_at_canopy: f64,
    ) -> f64;
}

/// 冠层积雪升华过程
#[derive(Clone)]
pub struct CanopySublimation {
    algorithm: SublimationAlgorithm,
    connectivity: Connectivity,
    formula: Option<Arc<dyn SublimationFormula>>,
}

impl fmt::Debug for CanopySublimation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanopySublimation")
            .field("algorithm", &self.algorithm)
            .field("connectivity", &self.connectivity)
            .field("formula", &self.formula.is_some())
            .finish()
    }
}

impl CanopySublimation {
    /// 按注册表解析连接并创建
    pub fn new(algorithm: SublimationAlgorithm, registry: &StateVarRegistry) -> HfResult<Self> {
        let snow = lookup(registry, CompartmentKind::CanopySnow)?;
        let atmosphere = lookup(registry, CompartmentKind::Atmosphere)?;
        let aet = lookup(registry, CompartmentKind::Aet)?;
        Ok(Self::with_connectivity(
            algorithm,
            Connectivity::from_connections(vec![
                Connection::new(snow, atmosphere),
                Connection::new(aet, aet),
            ]),
        ))
    }

    /// 使用给定连接创建
    pub(crate) fn with_connectivity(
        algorithm: SublimationAlgorithm,
        connectivity: Connectivity,
    ) -> Self {
        Self {
            algorithm,
            connectivity,
            formula: None,
        }
    }

    /// 挂接空气动力学升华公式
    pub fn with_formula(mut self, formula: Arc<dyn SublimationFormula>) -> Self {
        self.formula = Some(formula);
        self
    }

    /// 当前算法
    pub fn algorithm(&self) -> SublimationAlgorithm {
        self.algorithm
    }

    fn canopy_snow(&self) -> CompartmentIndex {
        self.connectivity.as_slice()[0].from
    }

    /// 冠层高度处风速
    // TODO: 需要按冠层高度、零平面位移和粗糙度换算观测风速，换算关系确定后替换
    fn wind_at_canopy(&self, _unit: &HydroUnit) -> HfResult<f64> {
        Err(HfError::not_implemented(WIND_ADJUSTMENT))
    }

    fn wind_driven_rate(&self, state: &StateVector, unit: &HydroUnit) -> HfResult<f64> {
        let wind = self.wind_at_canopy(unit)?;
        let formula = self
            .formula
            .as_ref()
            .ok_or_else(|| HfError::not_implemented(format!("{} 升华公式", self.algorithm.name())))?;
        Ok(unit.forest_coverage() * formula.sublimation_rate(self.algorithm, state, unit, wind))
    }
}

fn lookup(registry: &StateVarRegistry, kind: CompartmentKind) -> HfResult<CompartmentIndex> {
    registry
        .index(kind)
        .ok_or_else(|| HfError::missing_compartment(NAME, kind.name()))
}

impl HydroProcess for CanopySublimation {
    fn kind(&self) -> ProcessKind {
        ProcessKind::CanopySublimation
    }

    fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    fn et_slot(&self) -> Option<usize> {
        Some(1)
    }

    fn initialize(&mut self, registry: &StateVarRegistry) -> HfResult<()> {
        if self.algorithm.is_wind_driven() {
            return Err(HfError::not_implemented(format!(
                "{} ({})",
                WIND_ADJUSTMENT,
                self.algorithm.name()
            )));
        }
        HfError::check_size("CanopySublimation connections", 2, self.connectivity.len())?;
        let c = self.connectivity.as_slice();
        registry.expect_kind(NAME, 0, c[0].from, CompartmentKind::CanopySnow)?;
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
        HfError::check_size("CanopySublimation connections", 2, self.connectivity.len())?;
        HfError::check_size("RateVector", self.connectivity.len(), rates.len())?;
        rates.reset();

        if !ProcessHelpers::supports_unit(unit) {
            return Ok(());
        }
        let fc = unit.forest_coverage();
        if fc == 0.0 {
            return Ok(());
        }

        let pet = ProcessHelpers::remaining_pet(unit.forcing.pet, ctx.ledger, ctx.options);
        let (rate, pet_used) = match self.algorithm {
            SublimationAlgorithm::Maximum => (fc * pet, fc * pet),
            SublimationAlgorithm::All => {
                let rate = state.storage(self.canopy_snow()) / ctx.dt();
                (rate, rate)
            }
            _ => (self.wind_driven_rate(state, unit)?, 0.0),
        };

        rates[0] = rate;
        rates[1] = pet_used;
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
        rates[0] = old.min(state.storage(self.canopy_snow()) / ctx.dt());
        rates[1] -= old - rates[0];
    }

    fn participating_params(&self) -> Vec<ParameterSpec> {
        self.algorithm.participating_params()
    }
}

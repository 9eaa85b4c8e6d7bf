// crates/hf_physics/src/processes/mod.rs

//! 水文过程模块
//!
//! 每个过程描述一组隔室之间的质量转移：
//!
//! - [`CanopyEvaporation`]: 冠层截留水 -> 大气
//! - [`CanopySublimation`]: 冠层积雪 -> 大气
//! - [`CanopyDrip`]: 冠层截留水 -> 指定隔室
//! - [`Advection`]: 成分随水通量迁移
//!
//! 过程集合是封闭的，[`Process`] 枚举按变体委托到具体实现；
//! [`ProcessSelector`] 提供无需实例的静态查询。

pub mod advection;
pub mod canopy_drip;
pub mod canopy_evaporation;
pub mod canopy_sublimation;
pub mod registry;
pub mod traits;

pub use advection::{Advection, ConcentrationTransport, TransportModel};
pub use canopy_drip::{CanopyDrip, DripAlgorithm};
pub use canopy_evaporation::{CanopyEvaporation, EvaporationAlgorithm};
pub use canopy_sublimation::{CanopySublimation, SublimationAlgorithm, SublimationFormula};
pub use registry::{ProcessRates, ProcessRegistry, StepReport};
pub use traits::{
    Connection, Connectivity, FluxSnapshot, HydroProcess, ParamClass, ParameterSpec,
    ProcessHelpers, ProcessKind, RateVector, StepContext,
};

use hf_foundation::error::HfResult;
use serde::{Deserialize, Serialize};

use crate::state::{StateVarRegistry, StateVarSpec, StateVector};
use crate::unit::HydroUnit;

/// 过程变体选择（不含实例数据）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "process", content = "algorithm", rename_all = "snake_case")]
pub enum ProcessSelector {
    /// 冠层蒸发
    CanopyEvaporation(EvaporationAlgorithm),
    /// 冠层积雪升华
    CanopySublimation(SublimationAlgorithm),
    /// 冠层滴落
    CanopyDrip(DripAlgorithm),
    /// 成分对流
    Advection,
}

impl ProcessSelector {
    /// 过程类别
    pub fn kind(&self) -> ProcessKind {
        match self {
            Self::CanopyEvaporation(_) => ProcessKind::CanopyEvaporation,
            Self::CanopySublimation(_) => ProcessKind::CanopySublimation,
            Self::CanopyDrip(_) => ProcessKind::CanopyDrip,
            Self::Advection => ProcessKind::Advection,
        }
    }

    /// 涉及的状态变量
    ///
    /// 滴落目标和成分储量由配置决定，不在此列。
    pub fn participating_state_vars(&self) -> Vec<StateVarSpec> {
        match self {
            Self::CanopyEvaporation(alg) => alg.participating_state_vars(),
            Self::CanopySublimation(alg) => alg.participating_state_vars(),
            Self::CanopyDrip(alg) => alg.participating_state_vars(),
            Self::Advection => Vec::new(),
        }
    }

    /// 所需参数（对流的参数由输运模型给出）
    pub fn participating_params(&self) -> Vec<ParameterSpec> {
        match self {
            Self::CanopyEvaporation(alg) => alg.participating_params(),
            Self::CanopySublimation(alg) => alg.participating_params(),
            Self::CanopyDrip(alg) => alg.participating_params(),
            Self::Advection => Vec::new(),
        }
    }
}

/// 过程实例
#[derive(Debug, Clone)]
pub enum Process {
    /// 冠层蒸发
    CanopyEvaporation(CanopyEvaporation),
    /// 冠层积雪升华
    CanopySublimation(CanopySublimation),
    /// 冠层滴落
    CanopyDrip(CanopyDrip),
    /// 成分对流
    Advection(Advection),
}

impl Process {
    /// 对应的变体选择
    pub fn selector(&self) -> ProcessSelector {
        match self {
            Self::CanopyEvaporation(p) => ProcessSelector::CanopyEvaporation(p.algorithm()),
            Self::CanopySublimation(p) => ProcessSelector::CanopySublimation(p.algorithm()),
            Self::CanopyDrip(p) => ProcessSelector::CanopyDrip(p.algorithm()),
            Self::Advection(_) => ProcessSelector::Advection,
        }
    }

    fn inner(&self) -> &dyn HydroProcess {
        match self {
            Self::CanopyEvaporation(p) => p,
            Self::CanopySublimation(p) => p,
            Self::CanopyDrip(p) => p,
            Self::Advection(p) => p,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn HydroProcess {
        match self {
            Self::CanopyEvaporation(p) => p,
            Self::CanopySublimation(p) => p,
            Self::CanopyDrip(p) => p,
            Self::Advection(p) => p,
        }
    }
}

impl HydroProcess for Process {
    fn kind(&self) -> ProcessKind {
        self.inner().kind()
    }

    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn connectivity(&self) -> &Connectivity {
        self.inner().connectivity()
    }

    fn et_slot(&self) -> Option<usize> {
        self.inner().et_slot()
    }

    fn initialize(&mut self, registry: &StateVarRegistry) -> HfResult<()> {
        self.inner_mut().initialize(registry)
    }

    fn rates_of_change(
        &self,
        state: &StateVector,
        unit: &HydroUnit,
        ctx: &StepContext<'_>,
        rates: &mut RateVector,
    ) -> HfResult<()> {
        self.inner().rates_of_change(state, unit, ctx, rates)
    }

    fn apply_constraints(
        &self,
        state: &StateVector,
        unit: &HydroUnit,
        ctx: &StepContext<'_>,
        rates: &mut RateVector,
    ) {
        self.inner().apply_constraints(state, unit, ctx, rates)
    }

    fn participating_params(&self) -> Vec<ParameterSpec> {
        self.inner().participating_params()
    }
}

impl From<CanopyEvaporation> for Process {
    fn from(p: CanopyEvaporation) -> Self {
        Self::CanopyEvaporation(p)
    }
}

impl From<CanopySublimation> for Process {
    fn from(p: CanopySublimation) -> Self {
        Self::CanopySublimation(p)
    }
}

impl From<CanopyDrip> for Process {
    fn from(p: CanopyDrip) -> Self {
        Self::CanopyDrip(p)
    }
}

impl From<Advection> for Process {
    fn from(p: Advection) -> Self {
        Self::Advection(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CompartmentKind;

    #[test]
    fn test_static_state_vars() {
        let vars = ProcessSelector::CanopyEvaporation(EvaporationAlgorithm::Rutter)
            .participating_state_vars();
        assert_eq!(
            vars,
            vec![
                StateVarSpec::single(CompartmentKind::Canopy),
                StateVarSpec::single(CompartmentKind::Atmosphere),
                StateVarSpec::single(CompartmentKind::Aet),
            ]
        );
        assert_eq!(
            ProcessSelector::CanopyDrip(DripAlgorithm::SlowDrain).participating_state_vars(),
            vec![StateVarSpec::single(CompartmentKind::Canopy)]
        );
        assert!(ProcessSelector::Advection.participating_state_vars().is_empty());
    }

    #[test]
    fn test_enum_delegation() {
        let mut reg = StateVarRegistry::new();
        reg.register_all(SublimationAlgorithm::All.participating_state_vars())
            .unwrap();
        let mut process: Process = CanopySublimation::new(SublimationAlgorithm::All, &reg)
            .unwrap()
            .into();
        process.initialize(&reg).unwrap();
        assert_eq!(process.kind(), ProcessKind::CanopySublimation);
        assert_eq!(process.name(), "CanopySublimation");
        assert_eq!(process.et_slot(), Some(1));
        assert_eq!(process.connectivity().len(), 2);
        assert_eq!(
            process.selector(),
            ProcessSelector::CanopySublimation(SublimationAlgorithm::All)
        );
        assert!(process.participating_params().is_empty());
    }

    #[test]
    fn test_selector_serde() {
        let sel = ProcessSelector::CanopyDrip(DripAlgorithm::SlowDrain);
        let json = serde_json::to_string(&sel).unwrap();
        assert_eq!(json, r#"{"process":"canopy_drip","algorithm":"slow_drain"}"#);
        let back: ProcessSelector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sel);
    }
}

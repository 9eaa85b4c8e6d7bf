// crates/hf_physics/src/processes/canopy_drip.rs

//! 冠层滴落
//!
//! 将冠层截留水转移到调用方指定的目标隔室（通常为地表积水），
//! 不参与蒸散发账本。
//!
//! # 算法
//!
//! ```text
//! Rutter:    rate = (1 - p) · max((stor - Fc·cap)/dt, 0)
//! SlowDrain: rate = max((stor - Fc·cap)/dt, 0) + min(d · stor/Fc, stor/Fc/dt)
//! ```
//!
//! 其中 p 为茎流比例（未建模树干时为 0），d 为慢速滴落比例。

use hf_foundation::error::{HfError, HfResult};
use hf_foundation::index::CompartmentIndex;
use hf_foundation::require;
use serde::{Deserialize, Serialize};

use super::traits::{
    Connection, Connectivity, HydroProcess, ParamClass, ParameterSpec, ProcessHelpers,
    ProcessKind, RateVector, StepContext,
};
use crate::state::{CompartmentKind, StateVarRegistry, StateVarSpec, StateVector};
use crate::unit::HydroUnit;

const NAME: &str = "CanopyDrip";

/// 冠层滴落算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DripAlgorithm {
    /// 仅容量溢出
    Rutter,
    /// 溢出 + 按储量比例慢速释放
    SlowDrain,
}

impl DripAlgorithm {
    /// 算法名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rutter => "Rutter",
            Self::SlowDrain => "SlowDrain",
        }
    }

    /// 所需参数
    pub fn participating_params(&self) -> Vec<ParameterSpec> {
        match self {
            Self::Rutter => vec![
                ParameterSpec::new("FOREST_COVERAGE", ParamClass::LandUse),
                ParameterSpec::new("MAX_CAPACITY", ParamClass::Vegetation),
                ParameterSpec::new("STEMFLOW_FRAC", ParamClass::Vegetation),
            ],
            Self::SlowDrain => vec![
                ParameterSpec::new("DRIP_PROPORTION", ParamClass::Vegetation),
                ParameterSpec::new("MAX_CAPACITY", ParamClass::Vegetation),
                ParameterSpec::new("FOREST_COVERAGE", ParamClass::LandUse),
            ],
        }
    }

    /// 涉及的状态变量（目标隔室由用户指定，不在此列）
    pub fn participating_state_vars(&self) -> Vec<StateVarSpec> {
        vec![StateVarSpec::single(CompartmentKind::Canopy)]
    }
}

/// 冠层滴落过程
#[derive(Debug, Clone)]
pub struct CanopyDrip {
    algorithm: DripAlgorithm,
    connectivity: Connectivity,
}

impl CanopyDrip {
    /// 创建滴落过程
    ///
    /// 目标隔室为 `None` 时返回配置错误。
    pub fn new(
        algorithm: DripAlgorithm,
        destination: Option<CompartmentIndex>,
        registry: &StateVarRegistry,
    ) -> HfResult<Self> {
        let to = require!(destination, HfError::config("CanopyDrip: 目标隔室不存在"));
        let canopy = registry
            .index(CompartmentKind::Canopy)
            .ok_or_else(|| HfError::missing_compartment(NAME, CompartmentKind::Canopy.name()))?;
        Ok(Self {
            algorithm,
            connectivity: Connectivity::from_connections(vec![Connection::new(canopy, to)]),
        })
    }

    /// 当前算法
    pub fn algorithm(&self) -> DripAlgorithm {
        self.algorithm
    }

    /// 目标隔室
    pub fn destination(&self) -> CompartmentIndex {
        self.connectivity.as_slice()[0].to
    }

    fn canopy(&self) -> CompartmentIndex {
        self.connectivity.as_slice()[0].from
    }
}

impl HydroProcess for CanopyDrip {
    fn kind(&self) -> ProcessKind {
        ProcessKind::CanopyDrip
    }

    fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    fn initialize(&mut self, registry: &StateVarRegistry) -> HfResult<()> {
        registry.expect_kind(NAME, 0, self.canopy(), CompartmentKind::Canopy)?;
        match registry.kind_of(self.destination()) {
            None => {
                return Err(HfError::invalid_connection(
                    NAME,
                    0,
                    "已注册的目标隔室",
                    format!("未注册的索引 {}", self.destination()),
                ));
            }
            Some(
                kind @ (CompartmentKind::Canopy
                | CompartmentKind::Atmosphere
                | CompartmentKind::Aet
                | CompartmentKind::Constituent),
            ) => {
                return Err(HfError::invalid_connection(
                    NAME,
                    0,
                    "冠层以外的水储量隔室",
                    kind.name(),
                ));
            }
            Some(_) => {}
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
        HfError::check_size("RateVector", self.connectivity.len(), rates.len())?;
        rates.reset();

        if !ProcessHelpers::supports_unit(unit) {
            return Ok(());
        }
        let fc = unit.forest_coverage();
        if fc == 0.0 {
            return Ok(());
        }

        let dt = ctx.dt();
        let storage = state.storage(self.canopy());
        let overflow = ProcessHelpers::thresh_positive((storage - fc * unit.canopy_capacity()) / dt);

        rates[0] = match self.algorithm {
            DripAlgorithm::Rutter => {
                let stemflow = if ctx.registry.contains(CompartmentKind::Trunk) {
                    unit.vegetation.stemflow_frac
                } else {
                    0.0
                };
                (1.0 - stemflow) * overflow
            }
            DripAlgorithm::SlowDrain => {
                let per_area = storage / fc;
                overflow
                    + ProcessHelpers::thresh_min(
                        unit.vegetation.drip_proportion * per_area,
                        per_area / dt,
                    )
            }
        };
        Ok(())
    }

    fn apply_constraints(
        &self,
        state: &StateVector,
        unit: &HydroUnit,
        ctx: &StepContext<'_>,
        rates: &mut RateVector,
    ) {
        if !ProcessHelpers::supports_unit(unit) {
            return;
        }
        rates[0] = ProcessHelpers::clamp_outflow(rates[0], state.storage(self.canopy()), ctx.dt());
    }

    fn participating_params(&self) -> Vec<ParameterSpec> {
        self.algorithm.participating_params()
    }
}

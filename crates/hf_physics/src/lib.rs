// crates/hf_physics/src/lib.rs

//! HydroFlux 物理层 (Layer 3)
//!
//! 集总式水文模型的通量核算核心：
//! - 状态变量注册与状态向量 (state)
//! - 计算单元快照 (unit)
//! - 蒸散发竞争账本 (ledger)
//! - 水文过程及其顺序执行 (processes)
//! - 潜在蒸散发估算 (pet)
//! - 模型组装 (builder)
//!
//! # 时间步流程
//!
//! ```text
//! 每个单元:
//!   账本清零
//!   for 过程 in 注册顺序:
//!     rates_of_change -> apply_constraints -> 写账本 -> 提交状态
//! ```
//!
//! 单元之间相互独立，[`ProcessRegistry::step_units`] 按单元并行。
//!
//! # 示例
//!
//! ```
//! use hf_config::ModelOptions;
//! use hf_physics::builder::{ModelBuilder, ParameterTable, ProcessConfig};
//! use hf_physics::ledger::EtLedger;
//! use hf_physics::processes::{EvaporationAlgorithm, ParamClass};
//! use hf_physics::state::CompartmentKind;
//! use hf_physics::unit::{HydroUnit, UnitType};
//!
//! let params = ParameterTable::new().with(ParamClass::LandUse, "FOREST_COVERAGE", 0.5);
//! let model = ModelBuilder::new(ModelOptions::default())
//!     .with_process(ProcessConfig::CanopyEvaporation {
//!         algorithm: EvaporationAlgorithm::Maximum,
//!     })
//!     .build(&params)
//!     .unwrap();
//!
//! let mut unit = HydroUnit::new(0, UnitType::Standard);
//! unit.surface.forest_coverage = 0.5;
//! unit.forcing.pet = 4.0;
//!
//! let mut state = model.new_state();
//! let canopy = model.registry.index(CompartmentKind::Canopy).unwrap();
//! state[canopy] = 5.0;
//!
//! let mut ledger = EtLedger::new();
//! model.step(&mut state, &unit, 0.0, &mut ledger).unwrap();
//! assert!((state[canopy] - 3.0).abs() < 1e-12);
//! assert!((ledger.consumed() - 2.0).abs() < 1e-12);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod ledger;
pub mod pet;
pub mod processes;
pub mod state;
pub mod unit;

/// 层级标识
pub const LAYER: u8 = 3;

// 重导出常用类型
pub use builder::{AssembledModel, ModelBuilder, ParameterTable, ProcessConfig};
pub use ledger::{EtEntry, EtLedger};
pub use pet::{estimate_pet, is_daily_method, update_unit_pet};
pub use processes::{
    Advection, CanopyDrip, CanopyEvaporation, CanopySublimation, ConcentrationTransport,
    Connection, Connectivity, DripAlgorithm, EvaporationAlgorithm, FluxSnapshot, HydroProcess,
    ParamClass, ParameterSpec, Process, ProcessKind, ProcessRegistry, ProcessSelector,
    RateVector, StepContext, StepReport, SublimationAlgorithm, TransportModel,
};
pub use state::{CompartmentKind, StateVarRegistry, StateVarSpec, StateVector};
pub use unit::{CanopyState, ForcingSample, HydroUnit, SurfaceProps, UnitType, VegetationProps};

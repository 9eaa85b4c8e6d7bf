// crates/hf_physics/src/builder.rs

//! 模型组装
//!
//! 由过程配置列表组装可运行的模型：
//!
//! 1. 验证运行选项
//! 2. 按各过程的静态查询收集状态变量，建立注册表
//! 3. 构造过程并初始化（检查连接类型，风驱动升华在此被拒绝）
//! 4. 检查过程所需参数是否齐全
//!
//! 任一步失败即返回错误，不会得到部分组装的模型。

use std::collections::HashMap;
use std::sync::Arc;

use hf_config::ModelOptions;
use hf_foundation::error::{HfError, HfResult};
use hf_foundation::validation::{ValidationError, ValidationReport};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ledger::EtLedger;
use crate::processes::{
    Advection, CanopyDrip, CanopyEvaporation, CanopySublimation, DripAlgorithm,
    EvaporationAlgorithm, ParamClass, ParameterSpec, Process, ProcessRegistry,
    ProcessSelector, StepReport, SublimationAlgorithm, TransportModel,
};
use crate::state::{CompartmentKind, StateVarRegistry, StateVarSpec, StateVector};
use crate::unit::HydroUnit;

// ============================================================
// 过程配置
// ============================================================

/// 单个过程的配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "process", rename_all = "snake_case")]
pub enum ProcessConfig {
    /// 冠层蒸发
    CanopyEvaporation {
        /// 算法
        algorithm: EvaporationAlgorithm,
    },
    /// 冠层积雪升华
    CanopySublimation {
        /// 算法
        algorithm: SublimationAlgorithm,
    },
    /// 冠层滴落
    CanopyDrip {
        /// 算法
        algorithm: DripAlgorithm,
        /// 目标隔室
        #[serde(default)]
        destination: Option<StateVarSpec>,
    },
    /// 成分对流
    Advection {
        /// 成分名称
        constituent: String,
    },
}

impl ProcessConfig {
    /// 对应的变体选择
    pub fn selector(&self) -> ProcessSelector {
        match self {
            Self::CanopyEvaporation { algorithm } => ProcessSelector::CanopyEvaporation(*algorithm),
            Self::CanopySublimation { algorithm } => ProcessSelector::CanopySublimation(*algorithm),
            Self::CanopyDrip { algorithm, .. } => ProcessSelector::CanopyDrip(*algorithm),
            Self::Advection { .. } => ProcessSelector::Advection,
        }
    }

    /// 从 JSON 值解析
    ///
    /// `algorithm` 不属于对应过程时返回 `UnknownAlgorithm`，其余格式错误为序列化错误。
    pub fn from_value(value: Value) -> HfResult<Self> {
        if let (Some(process), Some(algorithm)) = (
            value.get("process").and_then(Value::as_str),
            value.get("algorithm"),
        ) {
            check_algorithm(process, algorithm)?;
        }
        serde_json::from_value(value).map_err(|e| HfError::serialization(e.to_string()))
    }

    /// 从 JSON 数组解析过程列表
    pub fn list_from_json_str(content: &str) -> HfResult<Vec<Self>> {
        let values: Vec<Value> =
            serde_json::from_str(content).map_err(|e| HfError::serialization(e.to_string()))?;
        values.into_iter().map(Self::from_value).collect()
    }
}

fn check_algorithm(process: &str, algorithm: &Value) -> HfResult<()> {
    fn parses<T: DeserializeOwned>(value: &Value) -> bool {
        T::deserialize(value).is_ok()
    }

    let (name, known) = match process {
        "canopy_evaporation" => ("CanopyEvaporation", parses::<EvaporationAlgorithm>(algorithm)),
        "canopy_sublimation" => ("CanopySublimation", parses::<SublimationAlgorithm>(algorithm)),
        "canopy_drip" => ("CanopyDrip", parses::<DripAlgorithm>(algorithm)),
        // 未知过程名交给 serde 报错
        _ => return Ok(()),
    };
    if known {
        return Ok(());
    }
    let shown = algorithm
        .as_str()
        .map(str::to_owned)
        .unwrap_or_else(|| algorithm.to_string());
    Err(HfError::unknown_algorithm(name, shown))
}

// ============================================================
// 参数表
// ============================================================

/// 按类别提供的参数表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterTable {
    classes: HashMap<ParamClass, HashMap<String, f64>>,
}

impl ParameterTable {
    /// 空参数表
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置参数
    pub fn insert(&mut self, class: ParamClass, name: impl Into<String>, value: f64) {
        self.classes
            .entry(class)
            .or_default()
            .insert(name.into(), value);
    }

    /// 链式设置参数
    pub fn with(mut self, class: ParamClass, name: impl Into<String>, value: f64) -> Self {
        self.insert(class, name, value);
        self
    }

    /// 读取参数
    pub fn get(&self, class: ParamClass, name: &str) -> Option<f64> {
        self.classes.get(&class)?.get(name).copied()
    }

    /// 是否提供了该参数
    pub fn has(&self, spec: &ParameterSpec) -> bool {
        self.get(spec.class, &spec.name).is_some()
    }

    /// 由单元属性生成冠层类参数
    pub fn from_unit(unit: &HydroUnit) -> Self {
        Self::new()
            .with(ParamClass::LandUse, "FOREST_COVERAGE", unit.surface.forest_coverage)
            .with(ParamClass::Vegetation, "MAX_CAPACITY", unit.canopy.capacity)
            .with(ParamClass::Vegetation, "TRUNK_FRACTION", unit.vegetation.trunk_fraction)
            .with(ParamClass::Vegetation, "STEMFLOW_FRAC", unit.vegetation.stemflow_frac)
            .with(ParamClass::Vegetation, "DRIP_PROPORTION", unit.vegetation.drip_proportion)
    }
}

// ============================================================
// 组装
// ============================================================

/// 组装完成的模型
#[derive(Debug)]
pub struct AssembledModel {
    /// 状态变量注册表
    pub registry: StateVarRegistry,
    /// 过程序列
    pub processes: ProcessRegistry,
    /// 运行选项
    pub options: ModelOptions,
}

impl AssembledModel {
    /// 按注册表大小创建全零状态
    pub fn new_state(&self) -> StateVector {
        StateVector::zeros(&self.registry)
    }

    /// 单元单步执行
    pub fn step(
        &self,
        state: &mut StateVector,
        unit: &HydroUnit,
        time: f64,
        ledger: &mut EtLedger,
    ) -> HfResult<StepReport> {
        self.processes
            .step(state, unit, &self.options, &self.registry, time, ledger)
    }

    /// 多单元并行单步执行
    pub fn step_units(
        &self,
        states: &mut [StateVector],
        units: &[HydroUnit],
        time: f64,
    ) -> HfResult<Vec<StepReport>> {
        self.processes
            .step_units(states, units, &self.options, &self.registry, time)
    }

    /// 运行前检查单元属性
    ///
    /// 警告写入日志，存在错误时返回 `HfError::Validation`。
    pub fn check_units(&self, units: &[HydroUnit]) -> HfResult<()> {
        let mut report = ValidationReport::new();
        for unit in units {
            report.merge(unit.validate());
        }
        for warning in &report.warnings {
            log::warn!("{}", warning);
        }
        report.into_result()
    }
}

/// 模型构建器
pub struct ModelBuilder {
    options: ModelOptions,
    processes: Vec<ProcessConfig>,
    transport: Option<Arc<dyn TransportModel>>,
    with_trunk: bool,
}

impl ModelBuilder {
    /// 使用运行选项创建
    pub fn new(options: ModelOptions) -> Self {
        Self {
            options,
            processes: Vec::new(),
            transport: None,
            with_trunk: false,
        }
    }

    /// 追加过程（顺序即执行顺序）
    pub fn with_process(mut self, config: ProcessConfig) -> Self {
        self.processes.push(config);
        self
    }

    /// 追加多个过程
    pub fn with_processes<I: IntoIterator<Item = ProcessConfig>>(mut self, configs: I) -> Self {
        self.processes.extend(configs);
        self
    }

    /// 设置成分输运模型（使用对流时必需）
    pub fn with_transport(mut self, transport: Arc<dyn TransportModel>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// 是否建模树干储量
    pub fn with_trunk(mut self, enabled: bool) -> Self {
        self.with_trunk = enabled;
        self
    }

    /// 组装模型
    pub fn build(self, params: &ParameterTable) -> HfResult<AssembledModel> {
        self.options.validate()?;

        let registry = self.build_registry()?;

        let mut processes = ProcessRegistry::new();
        for config in &self.processes {
            processes.register(self.construct(config, &registry)?);
        }
        processes.initialize_all(&registry)?;

        let mut report = ValidationReport::new();
        for idx in 0..processes.len() {
            let Some(process) = processes.get(idx) else {
                continue;
            };
            for spec in process.participating_params() {
                if !params.has(&spec) {
                    report.add_error(ValidationError::MissingParameter {
                        name: spec.name,
                        class: spec.class.to_string(),
                        process: process.name(),
                    });
                }
            }
        }
        report.into_result()?;

        log::debug!(
            "模型组装完成: {} 个状态变量, 过程 {:?}",
            registry.len(),
            processes.list_processes()
        );

        Ok(AssembledModel {
            registry,
            processes,
            options: self.options,
        })
    }

    fn build_registry(&self) -> HfResult<StateVarRegistry> {
        let mut registry = StateVarRegistry::new();
        for config in &self.processes {
            registry.register_all(config.selector().participating_state_vars())?;
            match config {
                ProcessConfig::CanopyDrip {
                    destination: Some(dest),
                    ..
                } => {
                    registry.register(*dest)?;
                }
                ProcessConfig::Advection { .. } => {
                    let transport = self.transport()?;
                    for &(from, to) in transport.water_pairs() {
                        registry.register(from)?;
                        registry.register(to)?;
                    }
                    registry.register_all(transport.state_vars())?;
                }
                _ => {}
            }
        }
        if self.with_trunk {
            registry.register(StateVarSpec::single(CompartmentKind::Trunk))?;
        }
        Ok(registry)
    }

    fn construct(&self, config: &ProcessConfig, registry: &StateVarRegistry) -> HfResult<Process> {
        let process = match config {
            ProcessConfig::CanopyEvaporation { algorithm } => {
                CanopyEvaporation::new(*algorithm, registry)?.into()
            }
            ProcessConfig::CanopySublimation { algorithm } => {
                CanopySublimation::new(*algorithm, registry)?.into()
            }
            ProcessConfig::CanopyDrip {
                algorithm,
                destination,
            } => {
                let to = destination.and_then(|d| registry.index_of(d.kind, d.level));
                CanopyDrip::new(*algorithm, to, registry)?.into()
            }
            ProcessConfig::Advection { constituent } => {
                Advection::new(constituent, Arc::clone(self.transport()?))?.into()
            }
        };
        Ok(process)
    }

    fn transport(&self) -> HfResult<&Arc<dyn TransportModel>> {
        self.transport
            .as_ref()
            .ok_or_else(|| HfError::config("使用对流过程时必须设置输运模型"))
    }
}

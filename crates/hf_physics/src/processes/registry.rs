// crates/hf_physics/src/processes/registry.rs

//! 过程注册中心与顺序执行
//!
//! 同一单元内按注册顺序逐个执行过程：计算速率、约束、写账本、
//! 立即提交状态。后面的过程看到的是前面过程提交后的状态和账本。
//! 不同单元之间相互独立，可并行执行。

use std::collections::HashMap;
use std::fmt;

use hf_config::ModelOptions;
use hf_foundation::error::{HfError, HfResult};
use rayon::prelude::*;

use super::traits::{
    FluxSnapshot, HydroProcess, ParameterSpec, ProcessKind, RateVector, StepContext,
};
use crate::ledger::EtLedger;
use crate::state::{StateVarRegistry, StateVector};
use crate::unit::HydroUnit;

/// 单个过程在本步的约束后速率
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRates {
    /// 过程注册序号
    pub index: usize,
    /// 过程名称
    pub name: &'static str,
    /// 约束后速率 [mm/d]
    pub rates: RateVector,
}

/// 单元单步执行结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// 按执行顺序的过程速率
    pub processes: Vec<ProcessRates>,
    /// 本步蒸散发总消耗 [mm]
    pub et_consumed: f64,
}

impl StepReport {
    /// 按名称查找第一个匹配过程的速率
    pub fn rates_of(&self, name: &str) -> Option<&RateVector> {
        self.processes
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.rates)
    }
}

/// 过程注册中心
#[derive(Default)]
pub struct ProcessRegistry {
    /// 已注册的过程（顺序即执行顺序）
    processes: Vec<Box<dyn HydroProcess>>,
    /// 名称到首个同名过程序号的映射
    name_index: HashMap<&'static str, usize>,
    /// 启用状态
    enabled: Vec<bool>,
}

impl fmt::Debug for ProcessRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRegistry")
            .field("processes", &self.list_processes())
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl ProcessRegistry {
    /// 创建空注册中心
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册过程，返回其序号
    pub fn register<P: HydroProcess + 'static>(&mut self, process: P) -> usize {
        let idx = self.processes.len();
        self.name_index.entry(process.name()).or_insert(idx);
        self.processes.push(Box::new(process));
        self.enabled.push(true);
        idx
    }

    /// 按序号获取过程
    pub fn get(&self, idx: usize) -> Option<&dyn HydroProcess> {
        self.processes.get(idx).map(|p| p.as_ref())
    }

    /// 按名称查找首个同名过程的序号
    pub fn find(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).copied()
    }

    /// 启用/禁用过程
    pub fn set_enabled(&mut self, idx: usize, enabled: bool) -> bool {
        match self.enabled.get_mut(idx) {
            Some(flag) => {
                *flag = enabled;
                true
            }
            None => false,
        }
    }

    /// 过程是否启用
    pub fn is_enabled(&self, idx: usize) -> bool {
        self.enabled.get(idx).copied().unwrap_or(false)
    }

    /// 所有已注册过程的名称
    pub fn list_processes(&self) -> Vec<&str> {
        self.processes.iter().map(|p| p.name()).collect()
    }

    /// 过程数
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// 初始化所有过程，遇到第一个错误即返回
    pub fn initialize_all(&mut self, registry: &StateVarRegistry) -> HfResult<()> {
        for process in &mut self.processes {
            process.initialize(registry)?;
        }
        log::debug!("已初始化 {} 个过程", self.processes.len());
        Ok(())
    }

    /// 所有过程所需参数（去重，保持首次出现顺序）
    pub fn participating_params(&self) -> Vec<ParameterSpec> {
        let mut params: Vec<ParameterSpec> = Vec::new();
        for param in self.processes.iter().flat_map(|p| p.participating_params()) {
            if !params.contains(&param) {
                params.push(param);
            }
        }
        params
    }

    /// 单元单步执行
    ///
    /// 账本在开始时清零。每个启用的过程依次：计算速率、约束、写账本、
    /// 提交状态。账本连接只累加到目标；非对流过程的通量记入快照供对流读取。
    pub fn step(
        &self,
        state: &mut StateVector,
        unit: &HydroUnit,
        options: &ModelOptions,
        registry: &StateVarRegistry,
        time: f64,
        ledger: &mut EtLedger,
    ) -> HfResult<StepReport> {
        state.check_len(registry)?;
        ledger.reset();

        let dt = options.timestep;
        let mut fluxes = FluxSnapshot::new();
        let mut report = StepReport::default();

        for (idx, process) in self.processes.iter().enumerate() {
            if !self.enabled[idx] {
                continue;
            }

            let mut rates = RateVector::for_process(process.as_ref());
            {
                let ctx = StepContext::new(time, options, registry, ledger, &fluxes);
                process.rates_of_change(state, unit, &ctx, &mut rates)?;
                process.apply_constraints(state, unit, &ctx, &mut rates);
            }

            if let Some(slot) = process.et_slot() {
                ledger.record(process.name(), rates[slot], dt);
            }

            let et_slot = process.et_slot();
            let track_flux = process.kind() != ProcessKind::Advection;
            for (slot, (conn, &rate)) in process
                .connectivity()
                .iter()
                .zip(rates.as_slice())
                .enumerate()
            {
                let amount = rate * dt;
                if et_slot == Some(slot) {
                    // 账本连接只累加
                    state[conn.to] += amount;
                    continue;
                }
                state[conn.from] -= amount;
                state[conn.to] += amount;
                if track_flux && !conn.is_self_loop() {
                    fluxes.record(conn.from, conn.to, rate);
                }
            }

            log::trace!(
                "单元{} {}: {:?}",
                unit.id,
                process.name(),
                rates.as_slice()
            );
            report.processes.push(ProcessRates {
                index: idx,
                name: process.name(),
                rates,
            });
        }

        report.et_consumed = ledger.consumed();
        Ok(report)
    }

    /// 多单元并行单步执行，每个单元使用独立账本
    pub fn step_units(
        &self,
        states: &mut [StateVector],
        units: &[HydroUnit],
        options: &ModelOptions,
        registry: &StateVarRegistry,
        time: f64,
    ) -> HfResult<Vec<StepReport>> {
        HfError::check_size("units", states.len(), units.len())?;

        states
            .par_iter_mut()
            .zip(units.par_iter())
            .map(|(state, unit)| {
                let mut ledger = EtLedger::new();
                self.step(state, unit, options, registry, time, &mut ledger)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processes::canopy_drip::{CanopyDrip, DripAlgorithm};
    use crate::processes::canopy_evaporation::{CanopyEvaporation, EvaporationAlgorithm};
    use crate::processes::canopy_sublimation::{CanopySublimation, SublimationAlgorithm};
    use crate::state::{CompartmentKind, StateVarSpec};
    use crate::unit::UnitType;

    fn registry() -> StateVarRegistry {
        let mut reg = StateVarRegistry::new();
        reg.register_all(EvaporationAlgorithm::Maximum.participating_state_vars())
            .unwrap();
        reg.register_all(SublimationAlgorithm::Maximum.participating_state_vars())
            .unwrap();
        reg.register(StateVarSpec::single(CompartmentKind::Ponded)).unwrap();
        reg
    }

    fn unit(fc: f64, cap: f64, pet: f64) -> HydroUnit {
        let mut unit = HydroUnit::new(0, UnitType::Standard);
        unit.surface.forest_coverage = fc;
        unit.canopy.capacity = cap;
        unit.forcing.pet = pet;
        unit
    }

    fn canopy_state(reg: &StateVarRegistry, canopy: f64, snow: f64) -> StateVector {
        let mut state = StateVector::zeros(reg);
        state[reg.index(CompartmentKind::Canopy).unwrap()] = canopy;
        state[reg.index(CompartmentKind::CanopySnow).unwrap()] = snow;
        state
    }

    #[test]
    fn test_register_and_lookup() {
        let reg = registry();
        let mut processes = ProcessRegistry::new();
        let a = processes.register(CanopyEvaporation::new(EvaporationAlgorithm::Maximum, &reg).unwrap());
        let b = processes.register(CanopyEvaporation::new(EvaporationAlgorithm::All, &reg).unwrap());
        assert_eq!((a, b), (0, 1));
        assert_eq!(processes.find("CanopyEvaporation"), Some(0));
        assert_eq!(processes.list_processes(), vec!["CanopyEvaporation"; 2]);
        assert!(processes.set_enabled(1, false));
        assert!(!processes.is_enabled(1));
        assert!(!processes.set_enabled(5, false));
        assert!(processes.get(1).is_some());
    }

    #[test]
    fn test_participating_params_deduplicated() {
        let reg = registry();
        let mut processes = ProcessRegistry::new();
        processes.register(CanopyEvaporation::new(EvaporationAlgorithm::Maximum, &reg).unwrap());
        processes.register(CanopySublimation::new(SublimationAlgorithm::Maximum, &reg).unwrap());
        let params = processes.participating_params();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "FOREST_COVERAGE");
    }

    #[test]
    fn test_step_commits_and_ledger() {
        let reg = registry();
        let mut processes = ProcessRegistry::new();
        processes.register(CanopyEvaporation::new(EvaporationAlgorithm::Maximum, &reg).unwrap());
        processes.register(CanopySublimation::new(SublimationAlgorithm::Maximum, &reg).unwrap());
        processes.initialize_all(&reg).unwrap();

        let unit = unit(0.5, 4.0, 4.0);
        let mut state = canopy_state(&reg, 10.0, 10.0);
        let options = ModelOptions::default();
        let mut ledger = EtLedger::new();
        let report = processes
            .step(&mut state, &unit, &options, &reg, 0.0, &mut ledger)
            .unwrap();

        // 蒸发 0.5 * 4 = 2，升华剩余预算 0.5 * (4 - 2) = 1
        assert!((report.rates_of("CanopyEvaporation").unwrap()[0] - 2.0).abs() < 1e-12);
        assert!((report.rates_of("CanopySublimation").unwrap()[0] - 1.0).abs() < 1e-12);
        assert!((ledger.consumed() - 3.0).abs() < 1e-12);
        assert!((report.et_consumed - 3.0).abs() < 1e-12);

        let aet = reg.index(CompartmentKind::Aet).unwrap();
        let atm = reg.index(CompartmentKind::Atmosphere).unwrap();
        assert!((state[aet] - 3.0).abs() < 1e-12);
        assert!((state[atm] - 3.0).abs() < 1e-12);
        assert!((state[reg.index(CompartmentKind::Canopy).unwrap()] - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_ledger_reset_between_steps() {
        let reg = registry();
        let mut processes = ProcessRegistry::new();
        processes.register(CanopyEvaporation::new(EvaporationAlgorithm::Maximum, &reg).unwrap());
        processes.initialize_all(&reg).unwrap();

        let unit = unit(1.0, 4.0, 1.0);
        let mut state = canopy_state(&reg, 10.0, 0.0);
        let options = ModelOptions::default();
        let mut ledger = EtLedger::new();
        for step in 0..3 {
            processes
                .step(&mut state, &unit, &options, &reg, step as f64, &mut ledger)
                .unwrap();
            assert!((ledger.consumed() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_disabled_process_skipped() {
        let reg = registry();
        let mut processes = ProcessRegistry::new();
        let idx = processes.register(CanopyEvaporation::new(EvaporationAlgorithm::All, &reg).unwrap());
        processes.initialize_all(&reg).unwrap();
        processes.set_enabled(idx, false);

        let unit = unit(1.0, 4.0, 1.0);
        let mut state = canopy_state(&reg, 2.0, 0.0);
        let mut ledger = EtLedger::new();
        let report = processes
            .step(&mut state, &unit, &ModelOptions::default(), &reg, 0.0, &mut ledger)
            .unwrap();
        assert!(report.processes.is_empty());
        assert!(ledger.is_empty());
        assert_eq!(state[reg.index(CompartmentKind::Canopy).unwrap()], 2.0);
    }

    #[test]
    fn test_drip_commits_to_destination() {
        let reg = registry();
        let mut processes = ProcessRegistry::new();
        processes.register(
            CanopyDrip::new(DripAlgorithm::Rutter, reg.index(CompartmentKind::Ponded), &reg).unwrap(),
        );
        processes.initialize_all(&reg).unwrap();

        let unit = unit(0.5, 4.0, 0.0);
        let mut state = canopy_state(&reg, 3.0, 0.0);
        let mut ledger = EtLedger::new();
        processes
            .step(&mut state, &unit, &ModelOptions::default(), &reg, 0.0, &mut ledger)
            .unwrap();
        assert!((state[reg.index(CompartmentKind::Ponded).unwrap()] - 1.0).abs() < 1e-12);
        assert!((state[reg.index(CompartmentKind::Canopy).unwrap()] - 2.0).abs() < 1e-12);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_state_size_checked() {
        let reg = registry();
        let processes = ProcessRegistry::new();
        let mut state = StateVector::from_vec(vec![0.0; 2]);
        let mut ledger = EtLedger::new();
        let result = processes.step(
            &mut state,
            &HydroUnit::new(0, UnitType::Standard),
            &ModelOptions::default(),
            &reg,
            0.0,
            &mut ledger,
        );
        assert!(matches!(result, Err(HfError::SizeMismatch { .. })));
    }

    #[test]
    fn test_step_units_parallel() {
        let reg = registry();
        let mut processes = ProcessRegistry::new();
        processes.register(CanopyEvaporation::new(EvaporationAlgorithm::Maximum, &reg).unwrap());
        processes.initialize_all(&reg).unwrap();

        let units: Vec<HydroUnit> = (0..16)
            .map(|i| {
                let mut u = unit(1.0, 4.0, i as f64 * 0.1);
                u.id = i;
                u
            })
            .collect();
        let mut states: Vec<StateVector> = (0..16).map(|_| canopy_state(&reg, 5.0, 0.0)).collect();

        let reports = processes
            .step_units(&mut states, &units, &ModelOptions::default(), &reg, 0.0)
            .unwrap();
        assert_eq!(reports.len(), 16);
        let canopy = reg.index(CompartmentKind::Canopy).unwrap();
        for (i, (state, report)) in states.iter().zip(&reports).enumerate() {
            let expected = i as f64 * 0.1;
            assert!((report.et_consumed - expected).abs() < 1e-12);
            assert!((state[canopy] - (5.0 - expected)).abs() < 1e-12);
        }

        assert!(processes
            .step_units(&mut states, &units[..3], &ModelOptions::default(), &reg, 0.0)
            .is_err());
    }
}

// crates/hf_physics/src/processes/advection.rs

//! 成分对流
//!
//! 溶解/悬浮成分随水文过程已经计算出的水通量迁移。质量平衡公式由
//! 输运模型 [`TransportModel`] 提供，本过程只负责连接管理和
//! 与其他过程相同的储量可用性、非负约束。
//!
//! 每条连接对应一对水隔室 (源, 目标)：
//!
//! ```text
//! 成分储量(源水隔室) -> 成分储量(目标水隔室)
//! rate = f(本步水通量, 源成分质量, 源水储量)
//! ```
//!
//! 水通量来自时间步上下文中的 [`FluxSnapshot`](super::traits::FluxSnapshot)，
//! 因此对流过程应排在水文过程之后。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use hf_foundation::error::{HfError, HfResult};
use hf_foundation::index::{CompartmentIndex, ConstituentIndex};
use hf_foundation::ensure;

use super::traits::{
    Connection, Connectivity, HydroProcess, ParameterSpec, ProcessKind, RateVector, StepContext,
};
use crate::state::{CompartmentKind, StateVarRegistry, StateVarSpec, StateVector};
use crate::unit::HydroUnit;

const NAME: &str = "Advection";

// ============================================================
// 输运模型
// ============================================================

/// 输运模型接口
pub trait TransportModel: Send + Sync {
    /// 按名称查找成分
    fn constituent_index(&self, name: &str) -> Option<ConstituentIndex>;

    /// 成分名称
    fn constituent_name(&self, c: ConstituentIndex) -> Option<&str>;

    /// 成分随之迁移的水通量对 (源水隔室, 目标水隔室)
    fn water_pairs(&self) -> &[(StateVarSpec, StateVarSpec)];

    /// 成分 c 在某水隔室中的储量隔室
    fn storage_spec(&self, c: ConstituentIndex, water: StateVarSpec) -> Option<StateVarSpec>;

    /// 需要注册的全部成分储量隔室
    fn state_vars(&self) -> Vec<StateVarSpec>;

    /// 对流质量速率
    ///
    /// `water_flux` 为水通量 [mm/d]，`mass` 为源成分质量，
    /// `water` 为源水储量 [mm]。
    fn advective_rate(&self, c: ConstituentIndex, water_flux: f64, mass: f64, water: f64) -> f64;

    /// 成分所需参数（可为空）
    fn participating_params(&self, c: ConstituentIndex) -> Vec<ParameterSpec>;
}

/// 浓度输运模型
///
/// 对流速率为 `q · mass / water`，源水储量低于干阈值时为零。
/// 成分 c 在第 j 个水隔室中的储量为 `Constituent` 隔室第 `c · n_water + j` 层。
#[derive(Debug, Clone)]
pub struct ConcentrationTransport {
    constituents: Vec<String>,
    water: Vec<StateVarSpec>,
    pairs: Vec<(StateVarSpec, StateVarSpec)>,
    dry_threshold: f64,
}

impl ConcentrationTransport {
    /// 默认干阈值 [mm]
    pub const DEFAULT_DRY_THRESHOLD: f64 = 1e-9;

    /// 指定携带成分的水隔室创建
    pub fn new(water: Vec<StateVarSpec>) -> HfResult<Self> {
        for spec in &water {
            ensure!(
                spec.kind.is_water_storage(),
                HfError::config(format!("{} 不是水储量隔室", spec))
            );
        }
        Ok(Self {
            constituents: Vec::new(),
            water,
            pairs: Vec::new(),
            dry_threshold: Self::DEFAULT_DRY_THRESHOLD,
        })
    }

    /// 设置干阈值
    pub fn with_dry_threshold(mut self, threshold: f64) -> Self {
        self.dry_threshold = threshold.max(0.0);
        self
    }

    /// 添加成分，重复名称返回已有索引
    pub fn add_constituent(&mut self, name: impl Into<String>) -> HfResult<ConstituentIndex> {
        let name = name.into();
        if let Some(c) = self.constituent_index(&name) {
            return Ok(c);
        }
        let c = ConstituentIndex::from_usize(self.constituents.len());
        let top_level = (c.as_usize() + 1) * self.water.len();
        if top_level > u16::MAX as usize {
            return Err(HfError::config(format!("成分 {} 的储量层号超出范围", name)));
        }
        self.constituents.push(name);
        Ok(c)
    }

    /// 添加水通量对
    pub fn add_water_pair(&mut self, from: StateVarSpec, to: StateVarSpec) -> HfResult<()> {
        for spec in [from, to] {
            if !self.water.contains(&spec) {
                return Err(HfError::config(format!("{} 未声明为携带成分的水隔室", spec)));
            }
        }
        if !self.pairs.contains(&(from, to)) {
            self.pairs.push((from, to));
        }
        Ok(())
    }

    /// 成分数量
    pub fn n_constituents(&self) -> usize {
        self.constituents.len()
    }
}

impl TransportModel for ConcentrationTransport {
    fn constituent_index(&self, name: &str) -> Option<ConstituentIndex> {
        self.constituents
            .iter()
            .position(|n| n == name)
            .map(ConstituentIndex::from_usize)
    }

    fn constituent_name(&self, c: ConstituentIndex) -> Option<&str> {
        self.constituents.get(c.as_usize()).map(String::as_str)
    }

    fn water_pairs(&self) -> &[(StateVarSpec, StateVarSpec)] {
        &self.pairs
    }

    fn storage_spec(&self, c: ConstituentIndex, water: StateVarSpec) -> Option<StateVarSpec> {
        if c.as_usize() >= self.constituents.len() {
            return None;
        }
        let j = self.water.iter().position(|w| *w == water)?;
        let level = u16::try_from(c.as_usize() * self.water.len() + j).ok()?;
        Some(StateVarSpec::at_level(CompartmentKind::Constituent, level))
    }

    fn state_vars(&self) -> Vec<StateVarSpec> {
        (0..self.constituents.len())
            .flat_map(|c| {
                self.water
                    .iter()
                    .filter_map(move |w| self.storage_spec(ConstituentIndex::from_usize(c), *w))
            })
            .collect()
    }

    fn advective_rate(&self, _c: ConstituentIndex, water_flux: f64, mass: f64, water: f64) -> f64 {
        if water <= self.dry_threshold {
            0.0
        } else {
            water_flux * mass / water
        }
    }

    fn participating_params(&self, _c: ConstituentIndex) -> Vec<ParameterSpec> {
        Vec::new()
    }
}

// ============================================================
// 对流过程
// ============================================================

/// 成分对流过程
#[derive(Clone)]
pub struct Advection {
    constituent: ConstituentIndex,
    constituent_name: String,
    transport: Arc<dyn TransportModel>,
    connectivity: Connectivity,
    /// 与每条连接对应的水通量
    water_links: Vec<Connection>,
}

impl fmt::Debug for Advection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Advection")
            .field("constituent", &self.constituent_name)
            .field("connectivity", &self.connectivity)
            .field("water_links", &self.water_links)
            .finish()
    }
}

impl Advection {
    /// 创建对流过程，成分未知时返回错误
    pub fn new(constituent_name: &str, transport: Arc<dyn TransportModel>) -> HfResult<Self> {
        let constituent = transport
            .constituent_index(constituent_name)
            .ok_or_else(|| HfError::unknown_constituent(constituent_name))?;
        Ok(Self {
            constituent,
            constituent_name: constituent_name.to_string(),
            transport,
            connectivity: Connectivity::new(),
            water_links: Vec::new(),
        })
    }

    /// 成分索引
    pub fn constituent(&self) -> ConstituentIndex {
        self.constituent
    }

    /// 成分名称
    pub fn constituent_name(&self) -> &str {
        &self.constituent_name
    }

    fn resolve(registry: &StateVarRegistry, spec: StateVarSpec) -> HfResult<CompartmentIndex> {
        registry
            .index_of(spec.kind, spec.level)
            .ok_or_else(|| HfError::missing_compartment(NAME, spec.to_string()))
    }
}

impl HydroProcess for Advection {
    fn kind(&self) -> ProcessKind {
        ProcessKind::Advection
    }

    fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    fn initialize(&mut self, registry: &StateVarRegistry) -> HfResult<()> {
        let mut connectivity = Connectivity::new();
        let mut water_links = Vec::new();

        for &(from, to) in self.transport.water_pairs() {
            let water_from = Self::resolve(registry, from)?;
            let water_to = Self::resolve(registry, to)?;
            let mass_from = self
                .transport
                .storage_spec(self.constituent, from)
                .ok_or_else(|| HfError::missing_compartment(NAME, format!("{} 的成分储量", from)))?;
            let mass_to = self
                .transport
                .storage_spec(self.constituent, to)
                .ok_or_else(|| HfError::missing_compartment(NAME, format!("{} 的成分储量", to)))?;

            connectivity.push(Connection::new(
                Self::resolve(registry, mass_from)?,
                Self::resolve(registry, mass_to)?,
            ));
            water_links.push(Connection::new(water_from, water_to));
        }

        self.connectivity = connectivity;
        self.water_links = water_links;
        log::debug!(
            "{} ({}) 初始化完成: {} 条连接",
            NAME,
            self.constituent_name,
            self.connectivity.len()
        );
        Ok(())
    }

    fn rates_of_change(
        &self,
        state: &StateVector,
        _unit: &HydroUnit,
        ctx: &StepContext<'_>,
        rates: &mut RateVector,
    ) -> HfResult<()> {
        HfError::check_size("RateVector", self.connectivity.len(), rates.len())?;

        let dt = ctx.dt();
        for (i, (conn, water)) in self.connectivity.iter().zip(&self.water_links).enumerate() {
            let q = ctx.fluxes.rate(water.from, water.to);
            // 浓度按时段初水量计算，本步已提交的通量要加回
            let water_start = state.storage(water.from) + ctx.fluxes.net_outflow(water.from) * dt;
            rates[i] = self.transport.advective_rate(
                self.constituent,
                q,
                state.storage(conn.from),
                water_start,
            );
        }
        Ok(())
    }

    fn apply_constraints(
        &self,
        state: &StateVector,
        _unit: &HydroUnit,
        ctx: &StepContext<'_>,
        rates: &mut RateVector,
    ) {
        let dt = ctx.dt();
        let mut drained: HashMap<CompartmentIndex, f64> = HashMap::new();

        for (i, conn) in self.connectivity.iter().enumerate() {
            let available = state.storage(conn.from) / dt;
            rates[i] = rates[i].max(0.0).min(available);
            *drained.entry(conn.from).or_insert(0.0) += rates[i];
        }

        // 同一储量被多条连接抽取时按比例缩减
        for (i, conn) in self.connectivity.iter().enumerate() {
            let available = state.storage(conn.from) / dt;
            let total = drained[&conn.from];
            if total > available && total > 0.0 {
                rates[i] *= available / total;
            }
        }
    }

    fn participating_params(&self) -> Vec<ParameterSpec> {
        self.transport.participating_params(self.constituent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::EtLedger;
    use crate::processes::traits::FluxSnapshot;
    use crate::unit::UnitType;
    use hf_config::ModelOptions;

    const PONDED: StateVarSpec = StateVarSpec::single(CompartmentKind::Ponded);
    const SOIL0: StateVarSpec = StateVarSpec::at_level(CompartmentKind::SoilMoisture, 0);
    const DEPRESSION: StateVarSpec = StateVarSpec::single(CompartmentKind::Depression);

    fn transport() -> ConcentrationTransport {
        let mut t = ConcentrationTransport::new(vec![PONDED, SOIL0, DEPRESSION]).unwrap();
        t.add_constituent("nitrate").unwrap();
        t.add_constituent("tracer").unwrap();
        t.add_water_pair(PONDED, SOIL0).unwrap();
        t.add_water_pair(PONDED, DEPRESSION).unwrap();
        t
    }

    fn registry(t: &ConcentrationTransport) -> StateVarRegistry {
        let mut reg = StateVarRegistry::new();
        reg.register_all([PONDED, SOIL0, DEPRESSION]).unwrap();
        reg.register_all(t.state_vars()).unwrap();
        reg
    }

    #[test]
    fn test_storage_levels() {
        let t = transport();
        let tracer = t.constituent_index("tracer").unwrap();
        assert_eq!(
            t.storage_spec(tracer, SOIL0),
            Some(StateVarSpec::at_level(CompartmentKind::Constituent, 4))
        );
        assert_eq!(t.state_vars().len(), 6);
        assert_eq!(t.constituent_name(tracer), Some("tracer"));
    }

    #[test]
    fn test_duplicate_constituent_and_dry_threshold() {
        let mut t = transport().with_dry_threshold(0.5);
        let nitrate = t.constituent_index("nitrate").unwrap();
        assert_eq!(t.add_constituent("nitrate").unwrap(), nitrate);
        assert_eq!(t.n_constituents(), 2);

        // 水量不超过阈值时视为干涸
        assert_eq!(t.advective_rate(nitrate, 1.0, 2.0, 0.5), 0.0);
        assert!((t.advective_rate(nitrate, 1.0, 2.0, 1.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_water_compartment_rejected() {
        assert!(ConcentrationTransport::new(vec![StateVarSpec::single(CompartmentKind::Atmosphere)]).is_err());
        let mut t = transport();
        assert!(t.add_water_pair(PONDED, StateVarSpec::single(CompartmentKind::Trunk)).is_err());
    }

    #[test]
    fn test_unknown_constituent() {
        let err = Advection::new("phosphorus", Arc::new(transport())).unwrap_err();
        assert!(matches!(err, HfError::UnknownConstituent { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_initialize_idempotent() {
        let t = transport();
        let reg = registry(&t);
        let mut process = Advection::new("nitrate", Arc::new(t)).unwrap();
        process.initialize(&reg).unwrap();
        let first = process.connectivity().clone();
        process.initialize(&reg).unwrap();
        assert_eq!(&first, process.connectivity());
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_initialize_missing_storage() {
        let t = transport();
        let mut reg = StateVarRegistry::new();
        reg.register_all([PONDED, SOIL0, DEPRESSION]).unwrap();
        let mut process = Advection::new("nitrate", Arc::new(t)).unwrap();
        assert!(matches!(
            process.initialize(&reg),
            Err(HfError::MissingCompartment { .. })
        ));
    }

    #[test]
    fn test_rates_and_proportional_constraint() {
        let t = transport();
        let reg = registry(&t);
        let mut process = Advection::new("nitrate", Arc::new(t.clone())).unwrap();
        process.initialize(&reg).unwrap();

        let ponded = reg.index_of(PONDED.kind, PONDED.level).unwrap();
        let soil = reg.index_of(SOIL0.kind, SOIL0.level).unwrap();
        let depression = reg.index_of(DEPRESSION.kind, DEPRESSION.level).unwrap();
        let c = t.constituent_index("nitrate").unwrap();
        let mass = t.storage_spec(c, PONDED).unwrap();
        let mass_idx = reg.index_of(mass.kind, mass.level).unwrap();

        let mut state = StateVector::zeros(&reg);
        state[mass_idx] = 1.0;

        // 时段初水量 0 + (1.2 - 0.3) = 0.9
        let mut fluxes = FluxSnapshot::new();
        fluxes.record(ponded, soil, 0.9);
        fluxes.record(ponded, depression, 0.3);
        fluxes.record(soil, ponded, 0.3);

        let options = ModelOptions::default();
        let ledger = EtLedger::new();
        let ctx = StepContext::new(0.0, &options, &reg, &ledger, &fluxes);
        let unit = HydroUnit::new(0, UnitType::Standard);

        let mut rates = RateVector::for_process(&process);
        process.rates_of_change(&state, &unit, &ctx, &mut rates).unwrap();
        assert!((rates[0] - 1.0).abs() < 1e-12);
        assert!((rates[1] - 1.0 / 3.0).abs() < 1e-12);

        process.apply_constraints(&state, &unit, &ctx, &mut rates);
        assert!((rates[0] + rates[1] - 1.0).abs() < 1e-12);
        assert!((rates[0] / rates[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_concentration_uses_start_of_step_water() {
        let t = transport();
        let reg = registry(&t);
        let mut process = Advection::new("tracer", Arc::new(t.clone())).unwrap();
        process.initialize(&reg).unwrap();

        let ponded = reg.index_of(PONDED.kind, PONDED.level).unwrap();
        let soil = reg.index_of(SOIL0.kind, SOIL0.level).unwrap();
        let c = t.constituent_index("tracer").unwrap();
        let mass = t.storage_spec(c, PONDED).unwrap();
        let mass_idx = reg.index_of(mass.kind, mass.level).unwrap();

        // 时段初 4 mm 水、4 单位质量，已提交 1 mm 下渗
        let mut state = StateVector::zeros(&reg);
        state[ponded] = 3.0;
        state[mass_idx] = 4.0;
        let mut fluxes = FluxSnapshot::new();
        fluxes.record(ponded, soil, 1.0);

        let options = ModelOptions::default();
        let ledger = EtLedger::new();
        let ctx = StepContext::new(0.0, &options, &reg, &ledger, &fluxes);
        let unit = HydroUnit::new(0, UnitType::Standard);

        let mut rates = RateVector::for_process(&process);
        process.rates_of_change(&state, &unit, &ctx, &mut rates).unwrap();
        process.apply_constraints(&state, &unit, &ctx, &mut rates);
        assert!((rates[0] - 1.0).abs() < 1e-12);
        assert_eq!(rates[1], 0.0);
    }

    #[test]
    fn test_dry_source_gives_zero() {
        let t = transport();
        assert_eq!(t.advective_rate(ConstituentIndex::new(0), 5.0, 1.0, 0.0), 0.0);
        assert!((t.advective_rate(ConstituentIndex::new(0), 2.0, 1.0, 4.0) - 0.5).abs() < 1e-12);
    }
}

// crates/hf_physics/src/ledger.rs

//! 蒸散发竞争账本
//!
//! 同一单元同一时间步内，所有蒸发/升华类过程共享一个 PET 预算。
//! 每个过程先读取此前过程已消耗的量，再写回自身的消耗。账本在每个
//! 时间步开始时清零，过程顺序改变会改变哪个过程看到被削减的预算。

/// 单条消耗记录
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EtEntry {
    /// 记录消耗的过程
    pub process: &'static str,
    /// 消耗量 [mm]
    pub amount: f64,
}

/// 实际蒸散发账本
#[derive(Debug, Clone, Default)]
pub struct EtLedger {
    consumed: f64,
    entries: Vec<EtEntry>,
}

impl EtLedger {
    /// 创建空账本
    pub fn new() -> Self {
        Self::default()
    }

    /// 时间步开始时清零
    pub fn reset(&mut self) {
        self.consumed = 0.0;
        self.entries.clear();
    }

    /// 本步已消耗量 [mm]
    #[inline]
    pub fn consumed(&self) -> f64 {
        self.consumed
    }

    /// 本步已消耗速率 [mm/d]
    #[inline]
    pub fn consumed_rate(&self, dt: f64) -> f64 {
        self.consumed / dt
    }

    /// 记录过程的消耗速率
    pub fn record(&mut self, process: &'static str, rate: f64, dt: f64) {
        let amount = rate * dt;
        self.consumed += amount;
        self.entries.push(EtEntry { process, amount });
    }

    /// 按写入顺序的记录
    pub fn entries(&self) -> &[EtEntry] {
        &self.entries
    }

    /// 本步是否无记录
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

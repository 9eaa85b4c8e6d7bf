// crates/hf_config/src/options.rs

//! 模型运行选项
//!
//! 与过程无关的全局设置：时间步长、是否关闭蒸散发竞争、PET 设置。
//! 过程在每个时间步只读访问。

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::evaporation::EvaporationOptions;

/// 模型运行选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    /// 时间步长 [d]
    #[serde(default = "default_timestep")]
    pub timestep: f64,

    /// 关闭蒸散发竞争
    ///
    /// 为真时各蒸发类过程都看到完整的 PET，不扣减账本中已消耗的部分。
    #[serde(default)]
    pub suppress_competitive_et: bool,

    /// 蒸散发设置
    #[serde(default)]
    pub evaporation: EvaporationOptions,
}

fn default_timestep() -> f64 {
    1.0
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            timestep: default_timestep(),
            suppress_competitive_et: false,
            evaporation: EvaporationOptions::default(),
        }
    }
}

impl ModelOptions {
    /// 指定时间步长创建
    pub fn with_timestep(timestep: f64) -> Self {
        Self {
            timestep,
            ..Default::default()
        }
    }

    /// 从 JSON 字符串解析并验证
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let options: ModelOptions = serde_json::from_str(content)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// 从文件加载选项
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        let options = Self::from_json_str(&content)?;
        log::debug!(
            "加载运行选项: {} (dt={} d, PET={})",
            path.as_ref().display(),
            options.timestep,
            options.evaporation.method.name()
        );
        Ok(options)
    }

    /// 验证选项有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(ConfigError::invalid("timestep", self.timestep, "时间步长必须为有限正数"));
        }

        self.evaporation.validate()
    }

    /// 保存选项到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }
}

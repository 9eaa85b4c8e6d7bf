// crates/hf_config/src/evaporation.rs

//! 潜在蒸散发 (PET) 估算设置
//!
//! 仅描述"用哪种方法"，具体公式在 `hf_physics::pet` 中实现。

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 潜在蒸散发估算方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetMethod {
    /// 恒定 3 mm/d
    Constant,
    /// 无蒸散发
    None,
    /// 直接使用强迫数据，缺测时用插补方法
    Data,
    /// 气温线性关系
    LinearTemp,
    /// 多种方法加权混合
    Blended,
    /// 由月均 PET 按温度偏差修正
    FromMonthly,
    /// 月蒸发因子（含森林与地形修正）
    MonthlyFactor,
    /// Penman-Monteith
    PenmanMonteith,
    /// Penman 组合方程
    PenmanCombination,
    /// Priestley-Taylor
    PriestleyTaylor,
    /// Hargreaves
    Hargreaves,
    /// Hargreaves (1985)
    Hargreaves1985,
    /// Turc (1961)
    Turc1961,
    /// Makkink (1957)
    Makkink1957,
    /// Hamon (1961)
    Hamon1961,
    /// Valiantzas 简化 Penman 式 33
    PenmanSimple33,
    /// Valiantzas 简化 Penman 式 39
    PenmanSimple39,
    /// Oudin
    Oudin,
    /// Linacre (1977)
    Linacre,
    /// Granger & Gray
    GrangerGray,
    /// MOHYSE：昼长与饱和水汽压的经验式
    Mohyse,
    /// Jensen-Haise（未实现）
    JensenHaise,
    /// Shuttleworth-Wallace（未实现）
    ShuttleworthWallace,
}

impl PetMethod {
    /// 方法名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Constant => "Constant",
            Self::None => "None",
            Self::Data => "Data",
            Self::LinearTemp => "LinearTemp",
            Self::Blended => "Blended",
            Self::FromMonthly => "FromMonthly",
            Self::MonthlyFactor => "MonthlyFactor",
            Self::PenmanMonteith => "PenmanMonteith",
            Self::PenmanCombination => "PenmanCombination",
            Self::PriestleyTaylor => "PriestleyTaylor",
            Self::Hargreaves => "Hargreaves",
            Self::Hargreaves1985 => "Hargreaves1985",
            Self::Turc1961 => "Turc1961",
            Self::Makkink1957 => "Makkink1957",
            Self::Hamon1961 => "Hamon1961",
            Self::PenmanSimple33 => "PenmanSimple33",
            Self::PenmanSimple39 => "PenmanSimple39",
            Self::Oudin => "Oudin",
            Self::Linacre => "Linacre",
            Self::GrangerGray => "GrangerGray",
            Self::Mohyse => "Mohyse",
            Self::JensenHaise => "JensenHaise",
            Self::ShuttleworthWallace => "ShuttleworthWallace",
        }
    }

    /// 是否为日尺度方法（无次日辐射修正）
    pub fn is_daily(&self) -> bool {
        matches!(
            self,
            Self::Linacre
                | Self::MonthlyFactor
                | Self::FromMonthly
                | Self::Turc1961
                | Self::JensenHaise
                | Self::Hamon1961
                | Self::LinearTemp
                | Self::Constant
        )
    }
}

/// 混合方法中的单项权重
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PetBlend {
    /// 参与混合的方法
    pub method: PetMethod,
    /// 权重
    pub weight: f64,
}

/// 蒸散发设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaporationOptions {
    /// 陆面 PET 方法
    #[serde(default = "default_method")]
    pub method: PetMethod,

    /// 开阔水面 PET 方法
    #[serde(default = "default_method")]
    pub open_water_method: PetMethod,

    /// 陆面 PET 缺测时的插补方法
    #[serde(default = "default_infill")]
    pub infill: PetMethod,

    /// 开阔水面 PET 缺测时的插补方法
    #[serde(default = "default_infill")]
    pub open_water_infill: PetMethod,

    /// 混合权重（仅 `Blended` 使用）
    #[serde(default)]
    pub blend: Vec<PetBlend>,

    /// 风速观测高度 [m]
    #[serde(default = "default_wind_height")]
    pub wind_measurement_height: f64,

    /// 气象站参考高程 [m]，缺省时取单元高程
    #[serde(default)]
    pub reference_elevation: Option<f64>,

    /// MOHYSE 方法系数 [mm/d]，全局参数 `MOHYSE_PET_COEFF`
    #[serde(default = "default_mohyse_coeff", alias = "MOHYSE_PET_COEFF")]
    pub mohyse_pet_coeff: f64,
}

fn default_method() -> PetMethod {
    PetMethod::Data
}

fn default_infill() -> PetMethod {
    PetMethod::Hargreaves1985
}

fn default_wind_height() -> f64 {
    2.0
}

fn default_mohyse_coeff() -> f64 {
    1.0
}

impl Default for EvaporationOptions {
    fn default() -> Self {
        Self {
            method: default_method(),
            open_water_method: default_method(),
            infill: default_infill(),
            open_water_infill: default_infill(),
            blend: Vec::new(),
            wind_measurement_height: default_wind_height(),
            reference_elevation: None,
            mohyse_pet_coeff: default_mohyse_coeff(),
        }
    }
}

impl EvaporationOptions {
    /// 验证设置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, infill) in [
            ("evaporation.infill", self.infill),
            ("evaporation.open_water_infill", self.open_water_infill),
        ] {
            if matches!(infill, PetMethod::Data | PetMethod::Blended) {
                return Err(ConfigError::invalid(key, infill.name(), "插补方法不能依赖强迫数据或混合"));
            }
        }

        if self.wind_measurement_height <= 0.0 || !self.wind_measurement_height.is_finite() {
            return Err(ConfigError::invalid(
                "evaporation.wind_measurement_height",
                self.wind_measurement_height,
                "观测高度必须为正",
            ));
        }

        if !(self.mohyse_pet_coeff >= 0.0 && self.mohyse_pet_coeff.is_finite()) {
            return Err(ConfigError::invalid(
                "evaporation.mohyse_pet_coeff",
                self.mohyse_pet_coeff,
                "系数必须为非负有限值",
            ));
        }

        let uses_blend = self.method == PetMethod::Blended
            || self.open_water_method == PetMethod::Blended;
        if uses_blend {
            if self.blend.is_empty() {
                return Err(ConfigError::Missing("evaporation.blend".into()));
            }
            let mut total = 0.0;
            for entry in &self.blend {
                if matches!(entry.method, PetMethod::Blended) {
                    return Err(ConfigError::invalid("evaporation.blend", entry.method.name(), "混合不能嵌套"));
                }
                if !(entry.weight >= 0.0) {
                    return Err(ConfigError::invalid("evaporation.blend", entry.weight, "权重不能为负"));
                }
                total += entry.weight;
            }
            if (total - 1.0).abs() > 1e-6 {
                return Err(ConfigError::invalid("evaporation.blend", total, "权重之和必须为 1"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_valid() {
        let opts = EvaporationOptions::default();
        assert!(opts.validate().is_ok());
        assert_eq!(opts.method, PetMethod::Data);
        assert_eq!(opts.infill, PetMethod::Hargreaves1985);
    }

    #[test]
    fn test_mohyse_coefficient() {
        let opts: EvaporationOptions =
            serde_json::from_str(r#"{ "method": "mohyse", "MOHYSE_PET_COEFF": 1.5 }"#).unwrap();
        assert_eq!(opts.method, PetMethod::Mohyse);
        assert_eq!(opts.mohyse_pet_coeff, 1.5);
        assert!(opts.validate().is_ok());

        let bad = EvaporationOptions {
            mohyse_pet_coeff: -0.1,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(ConfigError::InvalidValue { .. })));
        assert_eq!(EvaporationOptions::default().mohyse_pet_coeff, 1.0);
    }

    #[test]
    fn test_infill_cannot_be_data() {
        let opts = EvaporationOptions {
            infill: PetMethod::Data,
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_blend_weights() {
        let mut opts = EvaporationOptions {
            method: PetMethod::Blended,
            ..Default::default()
        };
        assert!(matches!(opts.validate(), Err(ConfigError::Missing(_))));

        opts.blend = vec![
            PetBlend { method: PetMethod::Constant, weight: 0.5 },
            PetBlend { method: PetMethod::Oudin, weight: 0.3 },
        ];
        assert!(opts.validate().is_err());

        opts.blend[1].weight = 0.5;
        assert!(opts.validate().is_ok());

        opts.blend[1].method = PetMethod::Blended;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_daily_methods() {
        assert!(PetMethod::Hamon1961.is_daily());
        assert!(PetMethod::Constant.is_daily());
        assert!(!PetMethod::PenmanMonteith.is_daily());
        assert!(!PetMethod::Hargreaves.is_daily());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&PetMethod::PriestleyTaylor).unwrap();
        assert_eq!(json, "\"priestley_taylor\"");
        let m: PetMethod = serde_json::from_str("\"hargreaves1985\"").unwrap();
        assert_eq!(m, PetMethod::Hargreaves1985);
    }
}

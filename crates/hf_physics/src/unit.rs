// crates/hf_physics/src/unit.rs

//! 计算单元 (HRU) 快照
//!
//! 过程在每个时间步只读访问单元的类型、地表/植被属性、冠层状态
//! 和强迫数据。单元属性的季节变化和强迫插值由外部完成，这里只是
//! 某一时刻的值。

use hf_foundation::validation::{check_finite, check_range, warn_if_low, ValidationReport};
use serde::{Deserialize, Serialize};

/// 单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    /// 普通陆面
    #[default]
    Standard,
    /// 湿地
    Wetland,
    /// 湖泊
    Lake,
    /// 裸岩
    Rock,
    /// 冰川
    Glacier,
}

impl UnitType {
    /// 冠层类过程是否作用于此类单元
    #[inline]
    pub fn supports_canopy(&self) -> bool {
        matches!(self, Self::Standard | Self::Wetland)
    }
}

/// 地表属性
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceProps {
    /// 森林覆盖率 [0..1]
    #[serde(default)]
    pub forest_coverage: f64,
    /// PET 气温线性系数 [mm/d/°C]
    #[serde(default)]
    pub pet_linear_coeff: f64,
    /// 月蒸发因子法的森林修正
    #[serde(default = "one")]
    pub forest_pet_corr: f64,
    /// Priestley-Taylor 系数
    #[serde(default = "default_pt_coeff")]
    pub priestley_taylor_coeff: f64,
}

fn one() -> f64 {
    1.0
}

fn default_pt_coeff() -> f64 {
    1.28
}

impl Default for SurfaceProps {
    fn default() -> Self {
        Self {
            forest_coverage: 0.0,
            pet_linear_coeff: 0.0,
            forest_pet_corr: one(),
            priestley_taylor_coeff: default_pt_coeff(),
        }
    }
}

/// 植被类别属性
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VegetationProps {
    /// 树干截留比例 [0..1]
    #[serde(default)]
    pub trunk_fraction: f64,
    /// 树干茎流比例 [0..1]
    #[serde(default)]
    pub stemflow_frac: f64,
    /// 慢速滴落比例 [1/d]
    #[serde(default)]
    pub drip_proportion: f64,
    /// PET 植被修正系数
    #[serde(default = "one")]
    pub pet_veg_corr: f64,
}

impl Default for VegetationProps {
    fn default() -> Self {
        Self {
            trunk_fraction: 0.0,
            stemflow_frac: 0.0,
            drip_proportion: 0.0,
            pet_veg_corr: one(),
        }
    }
}

/// 冠层状态（随季节变化的植被变量）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CanopyState {
    /// 冠层截留容量 [mm]
    #[serde(default)]
    pub capacity: f64,
    /// 植被高度 [m]
    #[serde(default)]
    pub height: f64,
    /// 冠层导度 [mm/s]
    #[serde(default)]
    pub canopy_conductance: f64,
    /// 粗糙高度 [m]
    #[serde(default)]
    pub roughness: f64,
    /// 零平面位移 [m]
    #[serde(default)]
    pub zero_plane_displacement: f64,
    /// 参考高度 [m]
    #[serde(default)]
    pub reference_height: f64,
}

/// 单元强迫数据（单个时间步）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForcingSample {
    /// 本步潜在蒸散发 [mm/d]
    pub pet: f64,
    /// 本步开阔水面潜在蒸发 [mm/d]
    pub ow_pet: f64,
    /// 观测 PET，缺测为 `None` [mm/d]
    pub pet_data: Option<f64>,
    /// 观测开阔水面 PET，缺测为 `None` [mm/d]
    pub ow_pet_data: Option<f64>,
    /// 风速 [m/s]
    pub wind_vel: f64,
    /// 时段平均气温 [°C]
    pub temp_ave: f64,
    /// 日平均气温 [°C]
    pub temp_daily_ave: f64,
    /// 日最低气温 [°C]
    pub temp_daily_min: f64,
    /// 日最高气温 [°C]
    pub temp_daily_max: f64,
    /// 月平均气温 [°C]
    pub temp_month_ave: f64,
    /// 月最低气温 [°C]
    pub temp_month_min: f64,
    /// 月最高气温 [°C]
    pub temp_month_max: f64,
    /// 未修正的平均气温 [°C]
    pub temp_ave_unc: f64,
    /// 未修正的最高气温 [°C]
    pub temp_max_unc: f64,
    /// 相对湿度 [0..1]
    pub rel_humidity: f64,
    /// 气压 [kPa]
    pub air_pres: f64,
    /// 空气密度 [kg/m³]
    pub air_dens: f64,
    /// 入射短波辐射 [MJ/m²/d]
    pub sw_radia: f64,
    /// 净短波辐射 [MJ/m²/d]
    pub sw_radia_net: f64,
    /// 净长波辐射 [MJ/m²/d]
    pub lw_radia_net: f64,
    /// 大气顶辐射 [MJ/m²/d]
    pub et_radia: f64,
    /// 昼长 [d]
    pub day_length: f64,
    /// 日角 [rad]
    pub day_angle: f64,
    /// 月平均 PET（月蒸发因子法中为因子） [mm/d]
    pub pet_month_ave: f64,
}

/// 计算单元快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydroUnit {
    /// 单元 ID
    pub id: usize,
    /// 单元类型
    #[serde(default)]
    pub unit_type: UnitType,
    /// 纬度 [°]
    #[serde(default)]
    pub latitude_deg: f64,
    /// 高程 [m]
    #[serde(default)]
    pub elevation: f64,
    /// 地表属性
    #[serde(default)]
    pub surface: SurfaceProps,
    /// 植被属性
    #[serde(default)]
    pub vegetation: VegetationProps,
    /// 冠层状态
    #[serde(default)]
    pub canopy: CanopyState,
    /// 强迫数据
    #[serde(default)]
    pub forcing: ForcingSample,
}

impl HydroUnit {
    /// 创建指定类型的单元，其余属性取默认值
    pub fn new(id: usize, unit_type: UnitType) -> Self {
        Self {
            id,
            unit_type,
            latitude_deg: 0.0,
            elevation: 0.0,
            surface: SurfaceProps::default(),
            vegetation: VegetationProps::default(),
            canopy: CanopyState::default(),
            forcing: ForcingSample::default(),
        }
    }

    /// 森林覆盖率
    #[inline]
    pub fn forest_coverage(&self) -> f64 {
        self.surface.forest_coverage
    }

    /// 冠层截留容量
    #[inline]
    pub fn canopy_capacity(&self) -> f64 {
        self.canopy.capacity
    }

    /// 组装期属性检查
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        let id = self.id;

        check_range(&mut report, "forest_coverage", id, self.surface.forest_coverage, 0.0, 1.0);
        check_range(&mut report, "trunk_fraction", id, self.vegetation.trunk_fraction, 0.0, 1.0);
        check_range(&mut report, "stemflow_frac", id, self.vegetation.stemflow_frac, 0.0, 1.0);
        check_range(&mut report, "latitude", id, self.latitude_deg, -90.0, 90.0);
        check_range(&mut report, "capacity", id, self.canopy.capacity, 0.0, f64::MAX);
        check_range(&mut report, "drip_proportion", id, self.vegetation.drip_proportion, 0.0, f64::MAX);
        check_finite(&mut report, "pet_veg_corr", id, self.vegetation.pet_veg_corr);
        check_finite(&mut report, "elevation", id, self.elevation);

        if self.unit_type.supports_canopy() && self.surface.forest_coverage > 0.0 {
            warn_if_low(&mut report, "capacity", id, self.canopy.capacity, f64::MIN_POSITIVE);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_canopy() {
        assert!(UnitType::Standard.supports_canopy());
        assert!(UnitType::Wetland.supports_canopy());
        assert!(!UnitType::Lake.supports_canopy());
        assert!(!UnitType::Rock.supports_canopy());
        assert!(!UnitType::Glacier.supports_canopy());
    }

    #[test]
    fn test_validate_ok() {
        let mut unit = HydroUnit::new(1, UnitType::Standard);
        unit.surface.forest_coverage = 0.6;
        unit.canopy.capacity = 5.0;
        let report = unit.validate();
        assert!(report.is_valid());
        assert!(!report.has_warnings());
    }

    #[test]
    fn test_validate_fraction_out_of_range() {
        let mut unit = HydroUnit::new(2, UnitType::Wetland);
        unit.surface.forest_coverage = 1.4;
        unit.vegetation.stemflow_frac = f64::NAN;
        let report = unit.validate();
        assert_eq!(report.error_count(), 2);
    }

    #[test]
    fn test_zero_capacity_forest_warns() {
        let mut unit = HydroUnit::new(3, UnitType::Standard);
        unit.surface.forest_coverage = 0.5;
        let report = unit.validate();
        assert!(report.is_valid());
        assert!(report.has_warnings());
    }

    #[test]
    fn test_forcing_defaults_from_json() {
        let forcing: ForcingSample = serde_json::from_str(r#"{ "pet": 4.0 }"#).unwrap();
        assert_eq!(forcing.pet, 4.0);
        assert_eq!(forcing.wind_vel, 0.0);
        assert!(forcing.pet_data.is_none());
    }
}

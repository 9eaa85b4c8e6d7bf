// crates/hf_physics/src/pet/thermo.rs

//! 热力学与近地层辅助量
//!
//! 温度单位 °C，气压 kPa，风速 m/s，高度 m。

/// 水汽化潜热（常温近似）[MJ/kg]
pub const LH_VAPOR: f64 = 2.5;
/// 水密度 [kg/m³]
pub const DENSITY_WATER: f64 = 1000.0;
/// 空气密度 [kg/m³]
pub const DENSITY_AIR: f64 = 1.2041;
/// 空气比热 [MJ/kg/K]
pub const SPH_AIR: f64 = 1.012e-3;
/// von Karman 常数
pub const VON_KARMAN: f64 = 0.42;
/// 水汽与干空气分子量比
pub const AIR_H2O_MW_RATIO: f64 = 0.622;

// 单位换算
/// mm/m
pub const MM_PER_METER: f64 = 1000.0;
/// cm/m
pub const CM_PER_METER: f64 = 100.0;
/// mm/inch
pub const MM_PER_INCH: f64 = 25.4;
/// s/d
pub const SEC_PER_DAY: f64 = 86400.0;
/// mbar/kPa
pub const MB_PER_KPA: f64 = 10.0;
/// 0 °C 对应的开尔文温度
pub const ZERO_CELSIUS: f64 = 273.15;

/// 单位面积能量 [MJ/m²/d] 换算为水深 [mm/d]
#[inline]
pub fn energy_to_depth(energy: f64) -> f64 {
    energy / (LH_VAPOR * DENSITY_WATER / MM_PER_METER)
}

/// °C -> °F
#[inline]
pub fn celsius_to_fahrenheit(t: f64) -> f64 {
    t * 1.8 + 32.0
}

/// 太阳赤纬 [rad]，由日角按 Spencer (1971) 级数计算
pub fn solar_declination(day_angle: f64) -> f64 {
    0.006918 - 0.399912 * day_angle.cos() + 0.070257 * day_angle.sin()
        - 0.006758 * (2.0 * day_angle).cos()
        + 0.000907 * (2.0 * day_angle).sin()
        - 0.002697 * (3.0 * day_angle).cos()
        + 0.00148 * (3.0 * day_angle).sin()
}

/// 饱和水汽压 [kPa]，0 °C 以下按冰面计算
pub fn saturated_vapor_pressure(t: f64) -> f64 {
    if t >= 0.0 {
        0.61078 * (17.27 * t / (t + 237.3)).exp()
    } else {
        0.61078 * (21.875 * t / (t + 265.5)).exp()
    }
}

/// 饱和水汽压曲线斜率 [kPa/K]
#[inline]
pub fn sat_vap_slope(t: f64, sat_vap: f64) -> f64 {
    4098.0 * sat_vap / (t + 237.3).powi(2)
}

/// 汽化潜热随温度变化 [MJ/kg]
#[inline]
pub fn latent_heat_vaporization(t: f64) -> f64 {
    2.501 - 0.002361 * t
}

/// 干湿表常数 [kPa/K]
#[inline]
pub fn psychrometric_constant(pressure: f64, latent_heat: f64) -> f64 {
    0.0016286 * pressure / latent_heat
}

/// 露点温度 [°C]（Magnus 公式）
pub fn dew_point(t: f64, rel_humidity: f64) -> f64 {
    const A: f64 = 17.27;
    const B: f64 = 237.7;
    let gamma = A * t / (B + t) + rel_humidity.max(1e-6).ln();
    B * gamma / (A - gamma)
}

/// 大气导度 [mm/s]
///
/// 粗糙度非正或参考高度不高于粗糙度时为零。
pub fn atmospheric_conductance(
    wind_vel: f64,
    ref_height: f64,
    zero_plane: f64,
    roughness: f64,
    vap_roughness: f64,
) -> f64 {
    let z = ref_height - zero_plane;
    if roughness <= 0.0 || vap_roughness <= 0.0 || z <= roughness || z <= vap_roughness {
        return 0.0;
    }
    let denom = (z / roughness).ln() * (z / vap_roughness).ln();
    wind_vel * VON_KARMAN * VON_KARMAN / denom * MM_PER_METER
}

/// 垂向输送效率 [1/kPa]
pub fn vertical_transport_efficiency(
    pressure: f64,
    ref_height: f64,
    zero_plane: f64,
    roughness: f64,
) -> f64 {
    let z = ref_height - zero_plane;
    if pressure <= 0.0 || roughness <= 0.0 || z <= roughness {
        return 0.0;
    }
    let numer = AIR_H2O_MW_RATIO * DENSITY_AIR;
    let denom = pressure * DENSITY_WATER * (z / roughness).ln().powi(2);
    numer / denom * VON_KARMAN * VON_KARMAN
}

/// 干燥力 [mm/d/kPa]
#[inline]
pub fn drying_power(wind_vel: f64, veg_height: f64) -> f64 {
    let z0 = veg_height * CM_PER_METER / 7.6;
    (8.19 + 0.22 * z0) + (1.16 + 0.08 * z0) * wind_vel
}

/// 参与 Penman 类公式的热力学量
#[derive(Debug, Clone, Copy)]
pub struct Psychrometrics {
    /// 饱和水汽压 [kPa]
    pub sat_vap: f64,
    /// 斜率 [kPa/K]
    pub slope: f64,
    /// 汽化潜热 [MJ/kg]
    pub latent_heat: f64,
    /// 干湿表常数 [kPa/K]
    pub gamma: f64,
}

impl Psychrometrics {
    /// 由气温和气压计算
    pub fn at(t: f64, pressure: f64) -> Self {
        let sat_vap = saturated_vapor_pressure(t);
        let latent_heat = latent_heat_vaporization(t);
        Self {
            sat_vap,
            slope: sat_vap_slope(t, sat_vap),
            latent_heat,
            gamma: psychrometric_constant(pressure, latent_heat),
        }
    }

    /// Δ/(Δ+γ)
    #[inline]
    pub fn radiation_weight(&self) -> f64 {
        self.slope / (self.slope + self.gamma)
    }
}

// crates/hf_physics/src/pet/formulas.rs

//! 各 PET 方法的公式，返回 mm/d

use std::f64::consts::PI;

use super::thermo::{
    celsius_to_fahrenheit, dew_point, drying_power, energy_to_depth, saturated_vapor_pressure,
    solar_declination, Psychrometrics, DENSITY_WATER, LH_VAPOR, MB_PER_KPA, MM_PER_INCH,
    MM_PER_METER, SEC_PER_DAY, SPH_AIR, ZERO_CELSIUS,
};
use crate::unit::ForcingSample;

/// 月 PET 温度修正系数 [1/K]
const HBV_PET_TEMP_CORR: f64 = 0.5;
/// 月蒸发因子法的地形修正系数
const A0PELA: f64 = 0.9;

fn net_radiation(f: &ForcingSample) -> f64 {
    (f.sw_radia_net + f.lw_radia_net).max(0.0)
}

/// Makkink (1957)
pub fn makkink_1957(f: &ForcingSample) -> f64 {
    let p = Psychrometrics::at(f.temp_ave, f.air_pres);
    let pet = 0.61 * p.radiation_weight() * f.sw_radia * 23.8846 / 58.5 - 0.12;
    pet.max(0.0)
}

/// Turc (1961)，相对湿度低于 0.5 时做干旱修正
pub fn turc_1961(f: &ForcingSample) -> f64 {
    let t = f.temp_daily_ave.max(0.0);
    let mut pet = 0.013 * t / (t + 15.0) * (f.sw_radia * 23.8846 + 50.0);
    if f.rel_humidity < 0.5 {
        pet *= 1.0 + (50.0 - f.rel_humidity * 100.0) / 70.0;
    }
    pet.max(0.0)
}

/// Penman-Monteith
///
/// `atmos_cond`、`canopy_cond` 单位 mm/s，冠层导度为零时无蒸散。
pub fn penman_monteith(f: &ForcingSample, atmos_cond: f64, canopy_cond: f64) -> f64 {
    if canopy_cond == 0.0 {
        return 0.0;
    }
    let p = Psychrometrics::at(f.temp_ave, f.air_pres);
    let vapor_def = p.sat_vap * (1.0 - f.rel_humidity);

    let numer = p.slope * net_radiation(f)
        + f.air_dens * SPH_AIR * vapor_def * (atmos_cond * SEC_PER_DAY / MM_PER_METER);
    let denom = (p.slope + p.gamma * (1.0 + atmos_cond / canopy_cond)) * p.latent_heat * DENSITY_WATER;
    numer / denom * MM_PER_METER
}

/// Penman 组合方程，`vert_trans` 为垂向输送效率 [1/kPa]
pub fn penman_combination(f: &ForcingSample, vert_trans: f64) -> f64 {
    let p = Psychrometrics::at(f.temp_ave, f.air_pres);
    let vapor_def = p.sat_vap * (1.0 - f.rel_humidity);

    let numer = p.slope * net_radiation(f)
        + p.gamma * vert_trans * DENSITY_WATER * p.latent_heat * f.wind_vel * vapor_def * SEC_PER_DAY;
    let denom = DENSITY_WATER * p.latent_heat * (p.slope + p.gamma);
    (numer / denom).max(0.0) * MM_PER_METER
}

/// Priestley-Taylor
pub fn priestley_taylor(f: &ForcingSample, coeff: f64) -> f64 {
    let p = Psychrometrics::at(f.temp_ave, f.air_pres);
    coeff * p.radiation_weight() * net_radiation(f) / p.latent_heat / DENSITY_WATER * MM_PER_METER
}

/// Hargreaves，使用月最高/最低气温 (°F)
pub fn hargreaves(f: &ForcingSample) -> f64 {
    const HARGREAVES_CONST: f64 = 0.0075;
    let ra = energy_to_depth(f.et_radia);
    let ct = if f.rel_humidity >= 0.54 {
        0.035 * (100.0 * (1.0 - f.rel_humidity)).powf(0.333)
    } else {
        0.125
    };
    let del_t = (celsius_to_fahrenheit(f.temp_month_max) - celsius_to_fahrenheit(f.temp_month_min))
        .max(0.0);
    (HARGREAVES_CONST * ra * ct * del_t.sqrt() * celsius_to_fahrenheit(f.temp_daily_ave)).max(0.0)
}

/// Hargreaves (1985)
pub fn hargreaves_1985(f: &ForcingSample) -> f64 {
    const HARGREAVES_CONST: f64 = 0.0023;
    let ra = energy_to_depth(f.et_radia);
    let del_t = (f.temp_daily_max - f.temp_daily_min).max(0.0);
    (HARGREAVES_CONST * ra * del_t.sqrt() * (f.temp_daily_ave + 17.8)).max(0.0)
}

/// Hamon (1961)，`day_length` 单位 d
pub fn hamon_1961(f: &ForcingSample) -> f64 {
    let sat_vap = saturated_vapor_pressure(f.temp_daily_ave);
    // 绝对湿度 [g/m³]
    let abs_hum = 216.7 * (sat_vap * MB_PER_KPA) / (f.temp_daily_ave + ZERO_CELSIUS);
    0.0055 * 4.0 * abs_hum * f.day_length * f.day_length * MM_PER_INCH
}

/// Valiantzas (2006) 简化 Penman 式
///
/// 式 33 取 `(0.047, 0.09)`，式 39 取 `(0.038, 0.075)`。
pub fn penman_simple(f: &ForcingSample, radiation_coeff: f64, aero_coeff: f64) -> f64 {
    let rs = f.sw_radia;
    let ratio = if f.et_radia > 0.0 { rs / f.et_radia } else { 0.0 };
    let pet = radiation_coeff * rs * (f.temp_ave + 9.5).max(0.0).sqrt() - 2.4 * ratio * ratio
        + aero_coeff * (f.temp_ave + 20.0) * (1.0 - f.rel_humidity);
    pet.max(0.0)
}

/// Oudin
pub fn oudin(f: &ForcingSample) -> f64 {
    (f.et_radia / DENSITY_WATER / LH_VAPOR * MM_PER_METER * (f.temp_daily_ave + 5.0) / 100.0)
        .max(0.0)
}

/// Linacre (1977)，开阔水面使用更大的温度系数
pub fn linacre(f: &ForcingSample, latitude_deg: f64, open_water: bool) -> f64 {
    let t = f.temp_daily_ave;
    let t_dew = dew_point(t, f.rel_humidity);
    let coeff = if open_water { 700.0 } else { 500.0 };
    ((coeff * t / (100.0 - latitude_deg) + 15.0 * (t - t_dew)) / (80.0 - t)).max(0.0)
}

/// Granger & Gray
///
/// 净辐射扣除 10% 地热通量后换算为 mm/d，与干燥力同单位。
pub fn granger_gray(f: &ForcingSample, veg_height: f64) -> f64 {
    const GROUND_FLUX_FRACTION: f64 = 0.1;
    let rnet = energy_to_depth((f.sw_radia_net + f.lw_radia_net) * (1.0 - GROUND_FLUX_FRACTION));
    if rnet <= 0.0 {
        return 0.0;
    }
    let p = Psychrometrics::at(f.temp_ave, f.air_pres);
    let ea = drying_power(f.wind_vel, veg_height) * p.sat_vap * (1.0 - f.rel_humidity);

    // 相对干燥力
    let d = if ea > 0.0 {
        (1.0 / (1.0 + rnet / ea)).min(1.0)
    } else {
        0.0
    };
    // 相对蒸发
    let g = 1.0 / (0.793 + 0.2 * (4.902 * d).exp()) + 0.006 * d;

    ((p.slope * rnet + p.gamma * ea) / (p.slope + p.gamma / g)).max(0.0)
}

/// MOHYSE
///
/// 昼长比例乘以温度指数项。极昼、极夜时日落时角取 π 或 0。
pub fn mohyse(f: &ForcingSample, latitude_rad: f64, coeff: f64) -> f64 {
    let declination = solar_declination(f.day_angle);
    let cos_sunset = (-latitude_rad.tan() * declination.tan()).clamp(-1.0, 1.0);
    let t = f.temp_ave;
    (coeff / PI * cos_sunset.acos() * (17.3 * t / (238.0 + t)).exp()).max(0.0)
}

/// 由月均 PET 按未修正气温偏离月均值修正，比例限制在 [0, 2]
pub fn from_monthly(f: &ForcingSample) -> f64 {
    let ratio = (1.0 + HBV_PET_TEMP_CORR * (f.temp_ave_unc - f.temp_month_ave)).clamp(0.0, 2.0);
    f.pet_month_ave * ratio
}

/// 月蒸发因子法
///
/// `pet_month_ave` 此时存放月蒸发因子 [mm/d/K]，乘以未修正日最高气温；
/// 森林修正按覆盖率加权，地形修正按站点与单元高差。
pub fn monthly_factor(
    f: &ForcingSample,
    forest_coverage: f64,
    forest_pet_corr: f64,
    elevation: f64,
    ref_elevation: f64,
) -> f64 {
    let forest_corr = forest_pet_corr * forest_coverage + (1.0 - forest_coverage);
    let orographic = A0PELA * 0.001 * (ref_elevation - elevation);
    (forest_corr * (f.pet_month_ave * f.temp_max_unc + orographic)).max(0.0)
}

/// 气温线性关系
pub fn linear_temp(f: &ForcingSample, coeff: f64) -> f64 {
    coeff * f.temp_daily_ave.max(0.0)
}

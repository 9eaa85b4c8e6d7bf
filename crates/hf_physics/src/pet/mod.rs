// crates/hf_physics/src/pet/mod.rs

//! 潜在蒸散发估算
//!
//! 按 [`PetMethod`] 由单元强迫数据估算 PET [mm/d]，结果乘以植被修正系数。
//! 冠层过程读取的是 `ForcingSample::pet`，可由 [`update_unit_pet`] 在
//! 时间步开始前写入。

pub mod formulas;
pub mod thermo;

use hf_config::{EvaporationOptions, PetMethod};
use hf_foundation::error::{HfError, HfResult};

use crate::unit::{ForcingSample, HydroUnit};

/// 恒定方法的 PET [mm/d]
pub const CONSTANT_PET: f64 = 3.0;

/// 允许的数值负偏差，超出视为数据错误
const NEGATIVE_TOLERANCE: f64 = 1e-8;

/// 是否为日尺度方法
#[inline]
pub fn is_daily_method(method: PetMethod) -> bool {
    method.is_daily()
}

/// 估算 PET [mm/d]
///
/// `open_water` 为真时使用开阔水面的强迫数据和插补方法。
/// 结果低于 `-1e-8` 返回运行时错误，更小的负偏差按零处理。
pub fn estimate_pet(
    forcing: &ForcingSample,
    unit: &HydroUnit,
    options: &EvaporationOptions,
    method: PetMethod,
    open_water: bool,
) -> HfResult<f64> {
    let pet = raw_pet(forcing, unit, options, method, open_water)?;

    if !pet.is_finite() {
        return Err(HfError::runtime(format!(
            "单元{} {} 方法得到非有限 PET",
            unit.id,
            method.name()
        )));
    }
    if pet < -NEGATIVE_TOLERANCE {
        return Err(HfError::runtime(format!(
            "单元{} {} 方法得到负 PET ({} mm/d)",
            unit.id,
            method.name(),
            pet
        )));
    }
    let pet = if pet < 0.0 {
        log::warn!("单元{} PET 微小负值 {:e} 按零处理", unit.id, pet);
        0.0
    } else {
        pet
    };

    Ok(pet * unit.vegetation.pet_veg_corr)
}

/// 按选项中的陆面/水面方法更新单元本步 PET
pub fn update_unit_pet(unit: &mut HydroUnit, options: &EvaporationOptions) -> HfResult<()> {
    let forcing = unit.forcing;
    let pet = estimate_pet(&forcing, unit, options, options.method, false)?;
    let ow_pet = estimate_pet(&forcing, unit, options, options.open_water_method, true)?;
    unit.forcing.pet = pet;
    unit.forcing.ow_pet = ow_pet;
    Ok(())
}

/// 未修正的 PET
fn raw_pet(
    f: &ForcingSample,
    unit: &HydroUnit,
    options: &EvaporationOptions,
    method: PetMethod,
    open_water: bool,
) -> HfResult<f64> {
    let canopy = &unit.canopy;
    let pet = match method {
        PetMethod::Constant => CONSTANT_PET,
        PetMethod::None => 0.0,
        PetMethod::LinearTemp => formulas::linear_temp(f, unit.surface.pet_linear_coeff),
        PetMethod::Data => {
            let data = if open_water { f.ow_pet_data } else { f.pet_data };
            match data {
                Some(value) => value,
                None => {
                    let infill = if open_water {
                        options.open_water_infill
                    } else {
                        options.infill
                    };
                    if matches!(infill, PetMethod::Data | PetMethod::Blended) {
                        return Err(HfError::config(format!(
                            "PET 插补方法不能为 {}",
                            infill.name()
                        )));
                    }
                    log::warn!("单元{} PET 缺测，使用 {} 插补", unit.id, infill.name());
                    raw_pet(f, unit, options, infill, open_water)?
                }
            }
        }
        PetMethod::Blended => {
            if options.blend.is_empty() {
                return Err(HfError::config("Blended PET 未提供混合权重"));
            }
            let mut total = 0.0;
            for entry in &options.blend {
                if entry.method == PetMethod::Blended {
                    return Err(HfError::config("Blended PET 不能嵌套"));
                }
                total += entry.weight * raw_pet(f, unit, options, entry.method, open_water)?;
            }
            total
        }
        PetMethod::FromMonthly => formulas::from_monthly(f),
        PetMethod::MonthlyFactor => formulas::monthly_factor(
            f,
            unit.surface.forest_coverage,
            unit.surface.forest_pet_corr,
            unit.elevation,
            options.reference_elevation.unwrap_or(unit.elevation),
        ),
        PetMethod::PenmanMonteith => {
            let ref_ht = canopy.reference_height.max(options.wind_measurement_height);
            let atmos_cond = thermo::atmospheric_conductance(
                f.wind_vel,
                ref_ht,
                canopy.zero_plane_displacement,
                canopy.roughness,
                0.1 * canopy.roughness,
            );
            formulas::penman_monteith(f, atmos_cond, canopy.canopy_conductance)
        }
        PetMethod::PenmanCombination => {
            let ref_ht = canopy.reference_height.max(options.wind_measurement_height);
            let vert_trans = thermo::vertical_transport_efficiency(
                f.air_pres,
                ref_ht,
                canopy.zero_plane_displacement,
                canopy.roughness,
            );
            formulas::penman_combination(f, vert_trans)
        }
        PetMethod::PriestleyTaylor => {
            formulas::priestley_taylor(f, unit.surface.priestley_taylor_coeff)
        }
        PetMethod::Hargreaves => formulas::hargreaves(f),
        PetMethod::Hargreaves1985 => formulas::hargreaves_1985(f),
        PetMethod::Turc1961 => formulas::turc_1961(f),
        PetMethod::Makkink1957 => formulas::makkink_1957(f),
        PetMethod::Hamon1961 => formulas::hamon_1961(f),
        PetMethod::PenmanSimple33 => formulas::penman_simple(f, 0.047, 0.09),
        PetMethod::PenmanSimple39 => formulas::penman_simple(f, 0.038, 0.075),
        PetMethod::Oudin => formulas::oudin(f),
        PetMethod::Linacre => formulas::linacre(f, unit.latitude_deg, open_water),
        PetMethod::GrangerGray => formulas::granger_gray(f, canopy.height),
        PetMethod::Mohyse => {
            formulas::mohyse(f, unit.latitude_deg.to_radians(), options.mohyse_pet_coeff)
        }
        PetMethod::JensenHaise | PetMethod::ShuttleworthWallace => {
            return Err(HfError::not_implemented(format!("PET 方法 {}", method.name())));
        }
    };
    Ok(pet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::UnitType;
    use hf_config::PetBlend;

    fn unit() -> HydroUnit {
        let mut unit = HydroUnit::new(7, UnitType::Standard);
        unit.forcing.et_radia = 25.0;
        unit.forcing.temp_daily_max = 25.0;
        unit.forcing.temp_daily_min = 9.0;
        unit.forcing.temp_daily_ave = 15.0;
        unit
    }

    fn pet(unit: &HydroUnit, options: &EvaporationOptions, method: PetMethod) -> HfResult<f64> {
        estimate_pet(&unit.forcing, unit, options, method, false)
    }

    #[test]
    fn test_constant_with_veg_corr() {
        let mut unit = unit();
        let options = EvaporationOptions::default();
        assert!((pet(&unit, &options, PetMethod::Constant).unwrap() - 3.0).abs() < 1e-12);
        unit.vegetation.pet_veg_corr = 0.5;
        assert!((pet(&unit, &options, PetMethod::Constant).unwrap() - 1.5).abs() < 1e-12);
        assert_eq!(pet(&unit, &options, PetMethod::None).unwrap(), 0.0);
    }

    #[test]
    fn test_data_and_infill() {
        let mut unit = unit();
        let options = EvaporationOptions::default();
        unit.forcing.pet_data = Some(4.2);
        assert!((pet(&unit, &options, PetMethod::Data).unwrap() - 4.2).abs() < 1e-12);

        unit.forcing.pet_data = None;
        let infilled = pet(&unit, &options, PetMethod::Data).unwrap();
        let expected = pet(&unit, &options, PetMethod::Hargreaves1985).unwrap();
        assert!((infilled - expected).abs() < 1e-12);
        assert!(infilled > 0.0);
    }

    #[test]
    fn test_open_water_data() {
        let mut unit = unit();
        unit.forcing.ow_pet_data = Some(5.0);
        let options = EvaporationOptions {
            open_water_infill: PetMethod::Constant,
            ..Default::default()
        };
        let ow = estimate_pet(&unit.forcing, &unit, &options, PetMethod::Data, true).unwrap();
        assert!((ow - 5.0).abs() < 1e-12);
        unit.forcing.ow_pet_data = None;
        let ow = estimate_pet(&unit.forcing, &unit, &options, PetMethod::Data, true).unwrap();
        assert!((ow - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_blended_weighted_sum() {
        let mut unit = unit();
        unit.surface.pet_linear_coeff = 0.2;
        let options = EvaporationOptions {
            method: PetMethod::Blended,
            blend: vec![
                PetBlend { method: PetMethod::Constant, weight: 0.25 },
                PetBlend { method: PetMethod::LinearTemp, weight: 0.75 },
            ],
            ..Default::default()
        };
        // 0.25 * 3 + 0.75 * 3
        assert!((pet(&unit, &options, PetMethod::Blended).unwrap() - 3.0).abs() < 1e-12);

        let empty = EvaporationOptions::default();
        assert!(pet(&unit, &empty, PetMethod::Blended).is_err());
    }

    #[test]
    fn test_stub_methods_fail() {
        let unit = unit();
        let options = EvaporationOptions::default();
        for method in [PetMethod::JensenHaise, PetMethod::ShuttleworthWallace] {
            let err = pet(&unit, &options, method).unwrap_err();
            assert!(matches!(err, HfError::NotImplemented { .. }));
        }
    }

    #[test]
    fn test_negative_pet() {
        let mut unit = unit();
        let options = EvaporationOptions::default();
        unit.surface.pet_linear_coeff = -1.0;
        assert!(matches!(
            pet(&unit, &options, PetMethod::LinearTemp),
            Err(HfError::Runtime(_))
        ));
        unit.surface.pet_linear_coeff = -1e-11;
        assert_eq!(pet(&unit, &options, PetMethod::LinearTemp).unwrap(), 0.0);
    }

    #[test]
    fn test_monthly_factor_reference_elevation() {
        let mut unit = unit();
        unit.elevation = 500.0;
        unit.forcing.pet_month_ave = 0.1;
        unit.forcing.temp_max_unc = 10.0;
        let mut options = EvaporationOptions::default();
        assert!((pet(&unit, &options, PetMethod::MonthlyFactor).unwrap() - 1.0).abs() < 1e-12);
        options.reference_elevation = Some(1500.0);
        assert!((pet(&unit, &options, PetMethod::MonthlyFactor).unwrap() - 1.9).abs() < 1e-12);
    }

    #[test]
    fn test_mohyse_uses_global_coefficient() {
        let mut unit = unit();
        unit.forcing.temp_ave = 20.0;
        unit.latitude_deg = 0.0;
        let mut options = EvaporationOptions::default();
        let base = pet(&unit, &options, PetMethod::Mohyse).unwrap();
        assert!((base - 0.5 * (17.3 * 20.0_f64 / 258.0).exp()).abs() < 1e-12);

        options.mohyse_pet_coeff = 0.5;
        unit.vegetation.pet_veg_corr = 0.8;
        let scaled = pet(&unit, &options, PetMethod::Mohyse).unwrap();
        assert!((scaled - base * 0.5 * 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_update_unit_pet() {
        let mut unit = unit();
        let options = EvaporationOptions {
            method: PetMethod::Constant,
            open_water_method: PetMethod::None,
            ..Default::default()
        };
        update_unit_pet(&mut unit, &options).unwrap();
        assert_eq!(unit.forcing.pet, 3.0);
        assert_eq!(unit.forcing.ow_pet, 0.0);
    }

    #[test]
    fn test_daily_methods() {
        assert!(is_daily_method(PetMethod::Hamon1961));
        assert!(!is_daily_method(PetMethod::PenmanMonteith));
    }
}

//! 配置校验模块
//!
//! 两层校验：
//! - 字段范围 (validator derive，定义在 contracts 中)
//! - 跨字段规则 (本模块手写)：预热 < 运行长度、回退 <= 迭代次数、
//!   雷达视场上下界、打包模态合法且不重复

use std::collections::HashSet;

use contracts::{CaptureBlueprint, ContractError, Modality};
use validator::Validate;

/// 校验 CaptureBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &CaptureBlueprint) -> Result<(), ContractError> {
    validate_ranges(blueprint)?;
    validate_run(blueprint)?;
    validate_postprocess(blueprint)?;
    validate_lidar(blueprint)?;
    validate_archive(blueprint)?;
    Ok(())
}

/// 字段范围校验
fn validate_ranges(blueprint: &CaptureBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|errors| {
        let message = errors.to_string().replace('\n', "; ");
        ContractError::config_validation("blueprint", message)
    })
}

/// 预热必须短于运行长度，否则一帧都不会输出
fn validate_run(blueprint: &CaptureBlueprint) -> Result<(), ContractError> {
    let run = &blueprint.run;
    if run.warmup_ticks >= run.frames_per_run {
        return Err(ContractError::config_validation(
            "run.warmup_ticks / run.frames_per_run",
            format!(
                "warmup_ticks ({}) must be < frames_per_run ({})",
                run.warmup_ticks, run.frames_per_run
            ),
        ));
    }
    Ok(())
}

fn validate_postprocess(blueprint: &CaptureBlueprint) -> Result<(), ContractError> {
    let pp = &blueprint.postprocess;
    if pp.lookback > pp.clip_rounds {
        return Err(ContractError::config_validation(
            "postprocess.lookback",
            format!(
                "lookback ({}) must be <= clip_rounds ({})",
                pp.lookback, pp.clip_rounds
            ),
        ));
    }
    Ok(())
}

fn validate_lidar(blueprint: &CaptureBlueprint) -> Result<(), ContractError> {
    let lidar = &blueprint.lidar;
    if lidar.lower_fov >= lidar.upper_fov {
        return Err(ContractError::config_validation(
            "lidar.lower_fov / lidar.upper_fov",
            format!(
                "lower_fov ({}) must be < upper_fov ({})",
                lidar.lower_fov, lidar.upper_fov
            ),
        ));
    }
    Ok(())
}

/// 打包模态：不重复，且必须是运行目录下的图像模态
fn validate_archive(blueprint: &CaptureBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for modality in &blueprint.archive.modalities {
        if *modality == Modality::Lidar {
            return Err(ContractError::config_validation(
                "archive.modalities",
                "lidar output is not stored in run folders",
            ));
        }
        if !seen.insert(modality) {
            return Err(ContractError::config_validation(
                format!("archive.modalities[{}]", modality.dir_name()),
                "duplicate modality",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_blueprint() -> CaptureBlueprint {
        CaptureBlueprint::default()
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_invalid_fps() {
        let mut bp = minimal_blueprint();
        bp.sync.fps = -5.0;
        let result = validate(&bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("fps"), "got: {err}");
    }

    #[test]
    fn test_zero_frames_per_run() {
        let mut bp = minimal_blueprint();
        bp.run.frames_per_run = 0;
        bp.run.warmup_ticks = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("frames_per_run"), "got: {err}");
    }

    #[test]
    fn test_warmup_longer_than_run() {
        let mut bp = minimal_blueprint();
        bp.run.frames_per_run = 10;
        bp.run.warmup_ticks = 10;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("warmup_ticks"), "got: {err}");
    }

    #[test]
    fn test_lookback_exceeds_rounds() {
        let mut bp = minimal_blueprint();
        bp.postprocess.clip_rounds = 3;
        bp.postprocess.lookback = 5;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("lookback"), "got: {err}");
    }

    #[test]
    fn test_empty_spawn_points() {
        let mut bp = minimal_blueprint();
        bp.vehicle.spawn_points.clear();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("spawn_points"), "got: {err}");
    }

    #[test]
    fn test_duplicate_archive_modality() {
        let mut bp = minimal_blueprint();
        bp.archive.modalities = vec![Modality::Rgb, Modality::Rgb];
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate modality"), "got: {err}");
    }

    #[test]
    fn test_lidar_not_archivable() {
        let mut bp = minimal_blueprint();
        bp.archive.modalities = vec![Modality::Lidar];
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_inverted_lidar_fov() {
        let mut bp = minimal_blueprint();
        bp.lidar.upper_fov = -40.0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("upper_fov"), "got: {err}");
    }
}

//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, CaptureBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<CaptureBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<CaptureBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<CaptureBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_partial() {
        let content = r#"
[world]
map = "Town02"

[vehicle]
spawn_points = [12, 40]

[camera]
width = 800
height = 600
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.world.map, "Town02");
        assert_eq!(bp.vehicle.spawn_points, vec![12, 40]);
        assert_eq!(bp.camera.width, 800);
        // untouched sections keep their defaults
        assert_eq!(bp.sync.fps, 30.0);
        assert_eq!(bp.vehicle.blueprint, "vehicle.tesla.model3");
    }

    #[test]
    fn test_parse_toml_custom_weather() {
        let content = r#"
[world.weather.custom]
cloudiness = 80.0
precipitation = 30.0
precipitation_deposits = 0.0
wind_intensity = 5.0
fog_density = 0.0
fog_distance = 0.0
fog_falloff = 0.2
wetness = 0.0
scattering_intensity = 0.0
mie_scattering_scale = 0.0
rayleigh_scattering_scale = 0.0331
sun_altitude_angle = 10.0
sun_azimuth_angle = 90.0
"#;
        let bp = parse_toml(content).unwrap();
        assert_eq!(bp.world.weather.parameters().cloudiness, 80.0);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "world": { "map": "Town01", "carla_port": 2100 },
            "sync": { "fps": 20.0, "on_timeout": "abort" },
            "archive": { "modalities": ["rgb", "semseg_masked"], "output": "out.zip" }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.world.carla_port, 2100);
        assert_eq!(bp.archive.modalities.len(), 2);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_rejects_unknown_modality() {
        let content = r#"
[archive]
modalities = ["rgb", "thermal"]
"#;
        assert!(matches!(
            parse_toml(content),
            Err(ContractError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("JSON"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}

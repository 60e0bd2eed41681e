use anyhow::Result;
use serde::*;
use std::path::PathBuf;

use crate::color::Color;
use crate::mesh::Transform;
use crate::scene::planting::{self, TreeParams};
use crate::stl::export::StlFormat;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub transform: Transform,
    pub position: [f32; 3],
    // None uses the color of each category
    pub mesh_color: Option<Color>,
    pub export_format: StlFormat,
    pub brush_distance: f32,
    pub tree: TreeParams,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            transform: Transform::default(),
            position: [0.0; 3],
            mesh_color: None,
            export_format: StlFormat::default(),
            brush_distance: 5.0,
            tree: TreeParams::default(),
            latitude: 40.4168,
            longitude: -3.7038,
        }
    }
}

impl Config {
    fn file_name() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("org", "twinscene", "twinscene")
            .ok_or(anyhow::anyhow!("Unknown configuration directory"))?;
        let dir = dirs.preference_dir();
        Ok(PathBuf::from(dir).join("twinscene.json"))
    }
    fn load() -> Result<Config> {
        let file_name = Self::file_name()?;
        let f = std::fs::File::open(file_name)?;
        let f = std::io::BufReader::new(f);
        let cfg: Config = serde_json::from_reader(f)?;
        cfg.validate()?;
        Ok(cfg)
    }
    pub fn validate(&self) -> Result<()> {
        self.transform.validate()?;
        self.tree.validate()?;
        planting::validate_brush_distance(self.brush_distance)?;
        if !(-90.0 ..= 90.0).contains(&self.latitude) {
            anyhow::bail!("invalid latitude {}", self.latitude);
        }
        if !(-180.0 ..= 180.0).contains(&self.longitude) {
            anyhow::bail!("invalid longitude {}", self.longitude);
        }
        if self.position.iter().any(|p| !p.is_finite()) {
            anyhow::bail!("invalid position {:?}", self.position);
        }
        Ok(())
    }
    pub fn save(&self) -> Result<PathBuf> {
        let file_name = Self::file_name()?;
        if let Some(d) = file_name.parent() {
            std::fs::create_dir_all(d)?
        }
        let f = std::fs::File::create(&file_name)?;
        let f = std::io::BufWriter::new(f);
        serde_json::to_writer_pretty(f, self)?;
        Ok(file_name)
    }

    pub fn load_or_default() -> Config {
        match Self::load() {
            Ok(c) => c,
            Err(e) => {
                log::debug!("using the default configuration: {e}");
                Config::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: Config = serde_json::from_str(r##"{"brush_distance": 8.0, "mesh_color": "#ff0000"}"##).unwrap();
        assert_eq!(cfg.brush_distance, 8.0);
        assert_eq!(cfg.mesh_color, Some(Color::new(255, 0, 0)));
        assert_eq!(cfg.transform, Transform::default());
        assert_eq!(cfg.export_format, StlFormat::Binary);
    }

    #[test]
    fn validation() {
        assert!(Config::default().validate().is_ok());
        let bad = [
            Config { brush_distance: 1e30, ..Config::default() },
            Config { latitude: 91.0, ..Config::default() },
            Config { transform: Transform { scale: 0.0, rotation: [0.0; 3] }, ..Config::default() },
            Config { tree: TreeParams { height_min: 3.0, height_max: 1.0, ..TreeParams::default() }, ..Config::default() },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{cfg:?}");
        }
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = Config {
            export_format: StlFormat::Ascii,
            ..Config::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"ascii\""));
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}

// src/config.rs

use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
io:
  frames_dir: frames
  output_dir: out
  save_overlays: false
loop:
  blur_ksize: 7
  threshold: 20
  morph_ksize: 7
  iterations: 4
  area_thr: 2600.0
  open_boundary_slope: 6.0
  sector:
    center_x: 315.0
    center_y: 62.0
    r_min: 0.0
    r_max: 280.0
    slope_left: -1.158
    slope_right: 1.047
logging:
  level: info
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.chordae.is_none());
        assert!(config.lv.is_none());
        let loop_cfg = config.loop_.unwrap();
        assert_eq!(loop_cfg.threshold, 20);
        assert_eq!(loop_cfg.sector.r_max, 280.0);
    }
}

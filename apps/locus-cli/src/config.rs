use anyhow::Context;
use locus_atmos::AtmosConfig;
use locus_kernel::{MapConfig, WorldConfig};
use locus_vision::VisionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything the launcher needs, loadable from one YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub world: WorldConfig,
    pub atmos: AtmosConfig,
    pub vision: VisionConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig {
                maps: vec![MapConfig {
                    name: "station".into(),
                    width: 16,
                    height: 10,
                    depth: 1,
                }],
                ..WorldConfig::default()
            },
            atmos: AtmosConfig::default(),
            vision: VisionConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locus_kernel::Role;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "
world:
  tick_rate: 10
atmos:
  diffusion_rate: 0.25
vision:
  opaque: [opaque, wall]
";
        let config: SimulationConfig = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(config.world.tick_rate, 10);
        assert_eq!(config.world.maps[0].name, "main");
        assert_eq!(config.atmos.diffusion_rate, 0.25);
        assert_eq!(config.atmos.process_interval, 0.1);
        assert_eq!(config.vision.opaque, vec![Role::Opaque, Role::Wall]);
        assert!(!config.vision.target_blocks);
    }

    #[test]
    fn missing_sections_use_launcher_defaults() {
        let config: SimulationConfig = serde_yaml::from_str("{}").expect("parse");
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.world.maps[0].name, "station");
    }

    #[test]
    fn load_reads_file_or_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sim.yaml");
        std::fs::write(&path, "world:\n  maps:\n    - {name: deck, width: 8, height: 6}\n")
            .expect("write");
        let config = SimulationConfig::load(Some(&path)).expect("load");
        assert_eq!(config.world.maps[0].name, "deck");
        assert_eq!(config.world.maps[0].depth, 1);

        assert_eq!(SimulationConfig::load(None).expect("defaults"), SimulationConfig::default());
        assert!(SimulationConfig::load(Some(&dir.path().join("missing.yaml"))).is_err());
    }
}

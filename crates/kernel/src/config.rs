use serde::{Deserialize, Serialize};

/// World construction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Ticks per second for the run loop.
    pub tick_rate: u32,
    /// Maps created up front. The first one becomes the active map.
    pub maps: Vec<MapConfig>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tick_rate: 20,
            maps: vec![MapConfig::default()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    pub name: String,
    pub width: i32,
    pub height: i32,
    #[serde(default = "default_depth")]
    pub depth: i32,
}

fn default_depth() -> i32 {
    1
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            name: "main".into(),
            width: 100,
            height: 100,
            depth: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = WorldConfig::default();
        assert_eq!(c.tick_rate, 20);
        assert_eq!(c.maps.len(), 1);
        assert_eq!(c.maps[0].name, "main");
        assert_eq!((c.maps[0].width, c.maps[0].height, c.maps[0].depth), (100, 100, 1));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c: WorldConfig = serde_json::from_str(
            r#"{"maps":[{"name":"station","width":32,"height":16}]}"#,
        )
        .expect("parse");
        assert_eq!(c.tick_rate, 20);
        assert_eq!(c.maps[0].depth, 1);
        assert_eq!(c.maps[0].name, "station");
    }
}

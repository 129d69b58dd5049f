use std::io::Read;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct Config {
    /// Probability that a spawned tile is a 4 rather than a 2.
    #[serde(default = "defaults::four_probability")]
    pub four_probability: f64,

    /// Local save file.
    #[serde(default = "defaults::save_path")]
    pub save_path: PathBuf,

    /// File standing in for the cloud copy.
    #[serde(default = "defaults::cloud_path")]
    pub cloud_path: PathBuf,

    /// Timer tick cadence in milliseconds.
    #[serde(default = "defaults::tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            four_probability: defaults::four_probability(),
            save_path: defaults::save_path(),
            cloud_path: defaults::cloud_path(),
            tick_interval_ms: defaults::tick_interval_ms(),
        }
    }
}

impl Config {
    pub fn from_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut file = std::fs::File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let cfg: Self = toml::from_str(&contents)?;
        Ok(cfg)
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn four_probability() -> f64 {
        0.1
    }
    pub fn save_path() -> PathBuf {
        PathBuf::from("puzzle-save.json")
    }
    pub fn cloud_path() -> PathBuf {
        PathBuf::from("puzzle-cloud.json")
    }
    pub fn tick_interval_ms() -> u64 {
        1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: Config = toml::from_str("four_probability = 0.25").unwrap();
        assert_eq!(cfg.four_probability, 0.25);
        assert_eq!(cfg.tick_interval_ms, 1000);
        assert_eq!(cfg.save_path, PathBuf::from("puzzle-save.json"));
    }

    #[test]
    fn empty_config_is_all_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg, Config::default());
    }
}

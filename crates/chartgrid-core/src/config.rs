//! User settings loaded from `settings.toml`.
//!
//! Every field has a default, so a partial file (or none at all) is fine.

use serde::{Deserialize, Serialize};
use std::path::Path;

use chartgrid_engine::engine::{
    DEFAULT_DECIMALS, DEFAULT_SERIAL_MAX, DEFAULT_SERIAL_MIN, DateSerialPolicy, MAX_DECIMALS,
};
use chartgrid_engine::{ChartSize, chart};

use crate::error::{GridError, Result};

const MAX_SETTINGS_FILE_BYTES: u64 = 1_048_576; // 1 MiB

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub grid: GridSettings,
    pub history: HistorySettings,
    pub dates: DateSettings,
    pub charts: ChartSettings,
    pub format: FormatSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub initial_rows: usize,
    pub initial_cols: usize,
    /// Rows appended when navigation or scrolling reaches the bottom edge.
    pub grow_rows: usize,
    pub grow_cols: usize,
    /// How close to the edge a scroll has to come before the grid grows.
    pub edge_margin: usize,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            initial_rows: 100,
            initial_cols: 26,
            grow_rows: 50,
            grow_cols: 10,
            edge_margin: 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub max_depth: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateSettings {
    pub recover_serials: bool,
    /// Exclusive lower bound for a number to be read as a date serial.
    pub serial_min: f64,
    pub serial_max: f64,
}

impl Default for DateSettings {
    fn default() -> Self {
        Self {
            recover_serials: true,
            serial_min: DEFAULT_SERIAL_MIN,
            serial_max: DEFAULT_SERIAL_MAX,
        }
    }
}

impl DateSettings {
    /// The serial window to apply on import, or None when recovery is off.
    pub fn policy(&self) -> Option<DateSerialPolicy> {
        self.recover_serials.then_some(DateSerialPolicy {
            min: self.serial_min,
            max: self.serial_max,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    pub default_width: usize,
    pub default_height: usize,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            default_width: chart::DEFAULT_WIDTH_CELLS,
            default_height: chart::DEFAULT_HEIGHT_CELLS,
        }
    }
}

impl ChartSettings {
    pub fn default_size(&self) -> ChartSize {
        ChartSize::new(self.default_width, self.default_height)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatSettings {
    pub currency_symbol: String,
    pub default_decimals: u8,
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            currency_symbol: "$".to_string(),
            default_decimals: DEFAULT_DECIMALS,
        }
    }
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Settings> {
        let settings: Settings =
            toml::from_str(text).map_err(|e| GridError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a file. A missing file is an error here; callers
    /// that treat the file as optional check for it first.
    pub fn load(path: &Path) -> Result<Settings> {
        let meta = std::fs::metadata(path)?;
        if meta.len() > MAX_SETTINGS_FILE_BYTES {
            return Err(GridError::Config(format!(
                "{} is too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_SETTINGS_FILE_BYTES
            )));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| GridError::Config(format!("{}: {}", path.display(), e)))
    }

    fn validate(&self) -> Result<()> {
        if self.grid.initial_rows == 0 || self.grid.initial_cols == 0 {
            return Err(GridError::Config(
                "grid.initial_rows and grid.initial_cols must be at least 1".to_string(),
            ));
        }
        if self.history.max_depth == 0 {
            return Err(GridError::Config(
                "history.max_depth must be at least 1".to_string(),
            ));
        }
        if self.dates.serial_min >= self.dates.serial_max {
            return Err(GridError::Config(format!(
                "dates.serial_min ({}) must be below dates.serial_max ({})",
                self.dates.serial_min, self.dates.serial_max
            )));
        }
        if !self.charts.default_size().is_valid() {
            return Err(GridError::Config(
                "charts.default_width and charts.default_height must be at least 1".to_string(),
            ));
        }
        if self.format.default_decimals > MAX_DECIMALS {
            return Err(GridError::Config(format!(
                "format.default_decimals must be at most {}",
                MAX_DECIMALS
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(Settings::from_toml_str("").unwrap(), Settings::default());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [grid]
            grow_rows = 20

            [dates]
            serial_min = 30000
            "#,
        )
        .unwrap();
        assert_eq!(settings.grid.grow_rows, 20);
        assert_eq!(settings.grid.initial_cols, 26);
        assert_eq!(settings.dates.serial_min, 30_000.0);
        assert_eq!(settings.dates.serial_max, 50_000.0);
        assert_eq!(settings.history.max_depth, 100);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            Settings::from_toml_str("[history]\nmax_depth = 0"),
            Err(GridError::Config(_))
        ));
        assert!(matches!(
            Settings::from_toml_str("[dates]\nserial_min = 60000"),
            Err(GridError::Config(_))
        ));
        assert!(matches!(
            Settings::from_toml_str("[grid]\ninitial_rows = \"many\""),
            Err(GridError::Config(_))
        ));
    }

    #[test]
    fn test_date_policy_follows_switch() {
        let mut dates = DateSettings::default();
        assert!(dates.policy().is_some());
        dates.recover_serials = false;
        assert!(dates.policy().is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[format]\ncurrency_symbol = \"€\"").unwrap();
        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.format.currency_symbol, "€");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Settings::load(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(GridError::Io(_))));
    }
}

//! Chart definitions and their cell wire format.
//!
//! A chart occupies a rectangular footprint of grid cells: the top-left
//! anchor cell holds the whole definition, every other footprint cell is a
//! data-less placeholder. Inside the grid this is carried by
//! [`CellValue::ChartAnchor`](crate::engine::CellValue::ChartAnchor) and
//! [`CellValue::ChartOccupied`](crate::engine::CellValue::ChartOccupied).
//!
//! When a grid leaves the engine as plain text (export, clipboard) the
//! anchor is written as `CHART:<json>:START` and placeholders as
//! `CHART:OCCUPIED`. [`Chart::decode`] accepts that wire form back and
//! never fails loudly: a malformed payload is simply `None`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::CellRef;

pub const CHART_PREFIX: &str = "CHART:";
pub const CHART_START_SUFFIX: &str = ":START";
pub const OCCUPIED_SENTINEL: &str = "CHART:OCCUPIED";

pub const DEFAULT_TITLE: &str = "Data Visualization";
pub const DEFAULT_COLORS: [&str; 3] = ["#8884d8", "#82ca9d", "#ffc658"];

pub const DEFAULT_WIDTH_CELLS: usize = 6;
pub const DEFAULT_HEIGHT_CELLS: usize = 15;
/// Largest width or height, in cells, a chart footprint may claim.
pub const MAX_CHART_SIDE_CELLS: usize = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Area,
    Scatter,
}

impl ChartKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Area => "area",
            ChartKind::Scatter => "scatter",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bar" => Some(ChartKind::Bar),
            "line" => Some(ChartKind::Line),
            "pie" => Some(ChartKind::Pie),
            "area" => Some(ChartKind::Area),
            "scatter" => Some(ChartKind::Scatter),
            _ => None,
        }
    }
}

/// One data point: a category name plus one value per series.
///
/// On the wire the name is keyed `name` (or `group`) and may be a bare
/// number; every other key is a numeric series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, serde_json::Value>")]
pub struct ChartRecord {
    pub name: String,
    #[serde(flatten)]
    pub series: BTreeMap<String, f64>,
}

impl ChartRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            series: BTreeMap::new(),
        }
    }

    pub fn with(mut self, series: impl Into<String>, value: f64) -> Self {
        self.series.insert(series.into(), value);
        self
    }
}

impl TryFrom<BTreeMap<String, serde_json::Value>> for ChartRecord {
    type Error = String;

    fn try_from(mut fields: BTreeMap<String, serde_json::Value>) -> Result<Self, Self::Error> {
        let name = fields
            .remove("name")
            .or_else(|| fields.remove("group"))
            .ok_or_else(|| "chart record has no name".to_string())?;
        let name = match name {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            other => return Err(format!("chart record name must be a scalar, got {}", other)),
        };

        let mut series = BTreeMap::new();
        for (key, value) in fields {
            let n = value
                .as_f64()
                .ok_or_else(|| format!("series {:?} is not numeric", key))?;
            series.insert(key, n);
        }
        Ok(Self { name, series })
    }
}

/// Footprint dimensions in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSize {
    #[serde(rename = "widthCells")]
    pub width: usize,
    #[serde(rename = "heightCells")]
    pub height: usize,
}

impl ChartSize {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        (1..=MAX_CHART_SIDE_CELLS).contains(&self.width)
            && (1..=MAX_CHART_SIDE_CELLS).contains(&self.height)
    }

    /// Exclusive bottom-right corner of this footprint placed at `anchor`,
    /// or None when it runs off the addressable grid.
    pub fn end_from(&self, anchor: CellRef) -> Option<CellRef> {
        Some(CellRef::new(
            anchor.row.checked_add(self.height)?,
            anchor.col.checked_add(self.width)?,
        ))
    }
}

impl Default for ChartSize {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH_CELLS, DEFAULT_HEIGHT_CELLS)
    }
}

/// A chart definition as stored in its anchor cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub data: Vec<ChartRecord>,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_colors", alias = "colorPalette")]
    pub colors: Vec<String>,
    #[serde(default)]
    pub size: ChartSize,
    #[serde(default)]
    pub anchor: CellRef,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_colors() -> Vec<String> {
    DEFAULT_COLORS.iter().map(|c| c.to_string()).collect()
}

impl Chart {
    pub fn new(kind: ChartKind, data: Vec<ChartRecord>) -> Self {
        Self {
            kind,
            data,
            title: default_title(),
            colors: default_colors(),
            size: ChartSize::default(),
            anchor: CellRef::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_colors(mut self, colors: Vec<String>) -> Self {
        self.colors = colors;
        self
    }

    /// Serialize into the anchor-cell wire form `CHART:<json>:START`.
    pub fn encode(&self) -> String {
        let payload = serde_json::to_string(self).unwrap_or_else(|e| {
            log::warn!("chart payload failed to serialize: {}", e);
            "{}".to_string()
        });
        format!("{}{}{}", CHART_PREFIX, payload, CHART_START_SUFFIX)
    }

    /// Whether a raw string looks like an anchor cell (it may still fail to decode).
    pub fn is_anchor_candidate(raw: &str) -> bool {
        raw.starts_with(CHART_PREFIX) && raw.contains(CHART_START_SUFFIX)
    }

    /// Parse an anchor-cell wire string. Malformed input yields None.
    ///
    /// The payload may itself contain `:` (series names such as
    /// `"Ratio: A/B"`), so everything between the prefix and the final
    /// `:START` is taken as JSON.
    pub fn decode(raw: &str) -> Option<Chart> {
        if !Self::is_anchor_candidate(raw) {
            return None;
        }
        let body = raw.strip_prefix(CHART_PREFIX)?;
        let payload = match body.strip_suffix(CHART_START_SUFFIX) {
            Some(p) => p,
            None => body.rsplit_once(CHART_START_SUFFIX)?.0,
        };
        match serde_json::from_str::<Chart>(payload) {
            Ok(chart) if chart.size.is_valid() => Some(chart),
            Ok(chart) => {
                log::warn!(
                    "ignoring chart payload with footprint {}x{}",
                    chart.size.width,
                    chart.size.height
                );
                None
            }
            Err(e) => {
                log::warn!("ignoring malformed chart payload: {}", e);
                None
            }
        }
    }

    /// Exclusive bottom-right corner of the footprint.
    pub fn end(&self) -> CellRef {
        CellRef::new(
            self.anchor.row.saturating_add(self.size.height),
            self.anchor.col.saturating_add(self.size.width),
        )
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        let end = self.end();
        (self.anchor.row..end.row).contains(&cell.row)
            && (self.anchor.col..end.col).contains(&cell.col)
    }

    /// Footprint cells in row-major order, anchor first.
    pub fn footprint(&self) -> impl Iterator<Item = CellRef> + use<> {
        footprint_cells(self.anchor, self.size)
    }
}

/// Cells covered by a footprint of `size` at `anchor`, row-major.
pub fn footprint_cells(anchor: CellRef, size: ChartSize) -> impl Iterator<Item = CellRef> {
    let end_row = anchor.row.saturating_add(size.height);
    let end_col = anchor.col.saturating_add(size.width);
    (anchor.row..end_row)
        .flat_map(move |row| (anchor.col..end_col).map(move |col| CellRef::new(row, col)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Chart {
        let mut chart = Chart::new(
            ChartKind::Bar,
            vec![
                ChartRecord::new("Q1").with("Ratio: A/B", 0.5).with("Sales", 12.0),
                ChartRecord::new("Q2").with("Ratio: A/B", 0.75).with("Sales", 18.0),
            ],
        )
        .with_title("Quarterly: overview");
        chart.size = ChartSize::new(4, 3);
        chart.anchor = CellRef::new(2, 1);
        chart
    }

    #[test]
    fn test_round_trip_with_colons_in_payload() {
        let chart = sample();
        let encoded = chart.encode();
        assert!(encoded.starts_with("CHART:{"));
        assert!(encoded.ends_with(":START"));
        assert_eq!(Chart::decode(&encoded), Some(chart));
    }

    #[test]
    fn test_decode_malformed_is_none() {
        assert_eq!(Chart::decode("CHART:not json:START"), None);
        assert_eq!(Chart::decode("CHART:{\"data\":[]}:START"), None);
        assert_eq!(Chart::decode(OCCUPIED_SENTINEL), None);
        assert_eq!(Chart::decode("hello"), None);
    }

    #[test]
    fn test_decode_rejects_oversized_footprints() {
        for (w, h) in [(usize::MAX, 1), (400_000_000, 400_000_000), (0, 3)] {
            let raw = format!(
                "CHART:{{\"type\":\"bar\",\"data\":[],\"size\":{{\"widthCells\":{},\"heightCells\":{}}}}}:START",
                w, h
            );
            assert_eq!(Chart::decode(&raw), None, "{}x{}", w, h);
        }
        assert!(ChartSize::new(MAX_CHART_SIDE_CELLS, MAX_CHART_SIDE_CELLS).is_valid());
        assert!(!ChartSize::new(MAX_CHART_SIDE_CELLS + 1, 1).is_valid());
    }

    #[test]
    fn test_footprint_end_at_grid_limit() {
        let size = ChartSize::new(2, 2);
        assert_eq!(size.end_from(CellRef::new(1, 1)), Some(CellRef::new(3, 3)));
        assert_eq!(size.end_from(CellRef::new(usize::MAX - 1, 0)), None);

        let mut chart = Chart::new(ChartKind::Line, Vec::new());
        chart.size = size;
        chart.anchor = CellRef::new(usize::MAX - 1, 0);
        assert!(chart.contains(CellRef::new(usize::MAX - 1, 1)));
        assert_eq!(chart.footprint().count(), 2);
    }

    #[test]
    fn test_decode_applies_defaults_and_aliases() {
        let raw = r#"CHART:{"type":"pie","data":[{"group":2001,"value":3}]}:START"#;
        let chart = Chart::decode(raw).unwrap();
        assert_eq!(chart.kind, ChartKind::Pie);
        assert_eq!(chart.title, DEFAULT_TITLE);
        assert_eq!(chart.colors.len(), 3);
        assert_eq!(chart.size, ChartSize::default());
        assert_eq!(chart.data[0].name, "2001");
        assert_eq!(chart.data[0].series.get("value"), Some(&3.0));
    }

    #[test]
    fn test_footprint_is_row_major() {
        let mut chart = sample();
        chart.size = ChartSize::new(2, 2);
        let cells: Vec<CellRef> = chart.footprint().collect();
        assert_eq!(
            cells,
            vec![
                CellRef::new(2, 1),
                CellRef::new(2, 2),
                CellRef::new(3, 1),
                CellRef::new(3, 2)
            ]
        );
        assert!(chart.contains(CellRef::new(3, 2)));
        assert!(!chart.contains(CellRef::new(4, 2)));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ChartKind::from_name(" Scatter "), Some(ChartKind::Scatter));
        assert_eq!(ChartKind::from_name("donut"), None);
        assert_eq!(ChartKind::Area.as_str(), "area");
    }
}

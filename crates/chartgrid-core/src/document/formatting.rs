//! Format operations applied to a cell or a rectangle.

use chartgrid_engine::engine::{
    Alignment, Borders, CellFormat, CellRef, DateStyle, MAX_DECIMALS,
};

use super::selection::Selection;
use super::sheet::Sheet;
use crate::config::FormatSettings;

/// Where a format operation lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatTarget {
    Cell(CellRef),
    /// The sheet's current selection.
    Selection,
    Range(Selection),
}

/// One formatting action. Toggles read their current state from the anchor
/// cell (where the selection started) and apply the flipped state to every
/// target cell, so a mixed selection becomes uniform.
#[derive(Clone, Debug, PartialEq)]
pub enum FormatOp {
    ToggleBold,
    ToggleItalic,
    ToggleUnderline,
    ToggleStrikethrough,
    TextColor(Option<String>),
    FillColor(Option<String>),
    Align(Option<Alignment>),
    Borders(Borders),
    ToggleComma,
    ToggleCurrency,
    TogglePercent,
    Decimals(Option<u8>),
    IncreaseDecimals,
    DecreaseDecimals,
    DateStyle(Option<DateStyle>),
    Clear,
}

impl Sheet {
    /// Apply `op` to every cell of `rect`. Returns the number of cells touched.
    pub fn apply_format(
        &mut self,
        rect: Selection,
        op: &FormatOp,
        settings: &FormatSettings,
    ) -> usize {
        let anchor = self.format(rect.start).cloned().unwrap_or_default();
        let mut touched = 0;
        for cell in rect.cells() {
            self.ensure_contains(cell);
            let mut format = self.format(cell).cloned().unwrap_or_default();
            update_format(&mut format, &anchor, op, settings);
            self.set_format(cell, format);
            touched += 1;
        }
        touched
    }
}

fn update_format(
    format: &mut CellFormat,
    anchor: &CellFormat,
    op: &FormatOp,
    settings: &FormatSettings,
) {
    let current_decimals = |f: &CellFormat| f.number.decimals.unwrap_or(settings.default_decimals);
    match op {
        FormatOp::ToggleBold => format.bold = !anchor.bold,
        FormatOp::ToggleItalic => format.italic = !anchor.italic,
        FormatOp::ToggleUnderline => format.underline = !anchor.underline,
        FormatOp::ToggleStrikethrough => format.strikethrough = !anchor.strikethrough,
        FormatOp::TextColor(color) => format.text_color = color.clone(),
        FormatOp::FillColor(color) => format.fill_color = color.clone(),
        FormatOp::Align(alignment) => format.alignment = *alignment,
        FormatOp::Borders(borders) => format.borders = *borders,
        FormatOp::ToggleComma => format.number.comma = !anchor.number.comma,
        FormatOp::ToggleCurrency => {
            format.number.currency = match anchor.number.currency {
                Some(_) => None,
                None => Some(settings.currency_symbol.clone()),
            };
            if format.number.currency.is_some() {
                format.number.percent = false;
            }
        }
        FormatOp::TogglePercent => {
            format.number.percent = !anchor.number.percent;
            if format.number.percent {
                format.number.currency = None;
            }
        }
        FormatOp::Decimals(decimals) => {
            format.number.decimals = decimals.map(|d| d.min(MAX_DECIMALS));
        }
        FormatOp::IncreaseDecimals => {
            format.number.decimals = Some((current_decimals(format) + 1).min(MAX_DECIMALS));
        }
        FormatOp::DecreaseDecimals => {
            format.number.decimals = Some(current_decimals(format).saturating_sub(1));
        }
        FormatOp::DateStyle(style) => format.date_style = *style,
        FormatOp::Clear => *format = CellFormat::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartgrid_engine::engine::CellValue;
    use pretty_assertions::assert_eq;

    fn a1(name: &str) -> CellRef {
        CellRef::from_a1(name).unwrap()
    }

    fn rect(from: &str, to: &str) -> Selection {
        Selection::new(a1(from), a1(to))
    }

    #[test]
    fn test_toggle_follows_anchor_cell() {
        let mut sheet = Sheet::new("Sheet 1", 5, 5);
        let settings = FormatSettings::default();
        sheet.apply_format(rect("B1", "B1"), &FormatOp::ToggleBold, &settings);

        // Anchor A1 is not bold, so the whole range turns bold.
        sheet.apply_format(rect("A1", "C1"), &FormatOp::ToggleBold, &settings);
        assert!(rect("A1", "C1").cells().all(|c| sheet.format(c).is_some_and(|f| f.bold)));

        sheet.apply_format(rect("A1", "C1"), &FormatOp::ToggleBold, &settings);
        assert!(rect("A1", "C1").cells().all(|c| sheet.format(c).is_none()));
    }

    #[test]
    fn test_number_styles_drive_display() {
        let mut sheet = Sheet::new("Sheet 1", 5, 5);
        let settings = FormatSettings::default();
        sheet.set_value(a1("A1"), CellValue::Number(1234.5)).unwrap();
        let cell = rect("A1", "A1");

        sheet.apply_format(cell, &FormatOp::ToggleCurrency, &settings);
        assert_eq!(sheet.display_value(a1("A1")), "$1,234.50");

        sheet.apply_format(cell, &FormatOp::DecreaseDecimals, &settings);
        assert_eq!(sheet.display_value(a1("A1")), "$1,234.5");

        sheet.apply_format(cell, &FormatOp::TogglePercent, &settings);
        assert_eq!(sheet.display_value(a1("A1")), "123450.0%");

        sheet.apply_format(cell, &FormatOp::Clear, &settings);
        assert_eq!(sheet.display_value(a1("A1")), "1234.5");
    }

    #[test]
    fn test_decimals_are_capped() {
        let mut sheet = Sheet::new("Sheet 1", 2, 2);
        let settings = FormatSettings::default();
        let cell = rect("A1", "A1");
        sheet.apply_format(cell, &FormatOp::Decimals(Some(200)), &settings);
        sheet.apply_format(cell, &FormatOp::IncreaseDecimals, &settings);
        assert_eq!(sheet.format(a1("A1")).and_then(|f| f.number.decimals), Some(MAX_DECIMALS));
    }

    #[test]
    fn test_date_style_wins_over_number_style() {
        let mut sheet = Sheet::new("Sheet 1", 2, 2);
        let settings = FormatSettings::default();
        sheet.set_value(a1("A1"), CellValue::Number(45_292.0)).unwrap();
        sheet.apply_format(rect("A1", "A1"), &FormatOp::ToggleComma, &settings);
        sheet.apply_format(
            rect("A1", "A1"),
            &FormatOp::DateStyle(Some(DateStyle::Iso)),
            &settings,
        );
        assert_eq!(sheet.display_value(a1("A1")), "2024-01-01");
    }
}

//! Per-cell formatting: number/date display rules and the visual style projection.

use serde::{Deserialize, Serialize};

use super::cell::CellValue;
use super::dates::{parse_date_input, serial_to_date};

/// Decimals used by number styles that don't carry an explicit count.
pub const DEFAULT_DECIMALS: u8 = 2;
/// Upper bound for explicit decimal places.
pub const MAX_DECIMALS: u8 = 12;

const BORDER_CSS: &str = "1px solid #000000";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn as_css(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateStyle {
    /// 01/05/2024
    Short,
    /// Jan 5, 2024
    Medium,
    /// Friday, January 5, 2024
    Long,
    /// 2024-01-05
    Iso,
}

impl DateStyle {
    fn pattern(self) -> &'static str {
        match self {
            DateStyle::Short => "%m/%d/%Y",
            DateStyle::Medium => "%b %-d, %Y",
            DateStyle::Long => "%A, %B %-d, %Y",
            DateStyle::Iso => "%Y-%m-%d",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borders {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl Borders {
    pub const ALL: Borders = Borders {
        top: true,
        right: true,
        bottom: true,
        left: true,
    };
}

/// Numeric display rules. All-default means "general" formatting.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberStyle {
    pub comma: bool,
    pub decimals: Option<u8>,
    pub currency: Option<String>,
    pub percent: bool,
}

impl NumberStyle {
    pub fn is_general(&self) -> bool {
        *self == NumberStyle::default()
    }

    fn decimals_or_default(&self) -> usize {
        self.decimals.unwrap_or(DEFAULT_DECIMALS).min(MAX_DECIMALS) as usize
    }
}

/// Independent per-cell formatting flags. A missing entry in a sheet's
/// format map is equivalent to `CellFormat::default()`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellFormat {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub text_color: Option<String>,
    pub fill_color: Option<String>,
    pub alignment: Option<Alignment>,
    pub borders: Borders,
    pub number: NumberStyle,
    pub date_style: Option<DateStyle>,
}

impl CellFormat {
    pub fn is_default(&self) -> bool {
        *self == CellFormat::default()
    }
}

/// Visual attributes derived from a [`CellFormat`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellStyle {
    pub font_weight: &'static str,
    pub font_style: &'static str,
    pub text_decoration: Option<String>,
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub text_align: Option<&'static str>,
    pub border_top: Option<&'static str>,
    pub border_right: Option<&'static str>,
    pub border_bottom: Option<&'static str>,
    pub border_left: Option<&'static str>,
}

impl CellStyle {
    /// Render as inline CSS declarations, omitting defaults.
    pub fn to_css(&self) -> String {
        let mut decls = Vec::new();
        if self.font_weight != "normal" {
            decls.push(format!("font-weight: {}", self.font_weight));
        }
        if self.font_style != "normal" {
            decls.push(format!("font-style: {}", self.font_style));
        }
        let optional = [
            ("text-decoration", self.text_decoration.as_deref()),
            ("color", self.color.as_deref()),
            ("background-color", self.background_color.as_deref()),
            ("text-align", self.text_align),
            ("border-top", self.border_top),
            ("border-right", self.border_right),
            ("border-bottom", self.border_bottom),
            ("border-left", self.border_left),
        ];
        for (name, value) in optional {
            if let Some(v) = value {
                decls.push(format!("{}: {}", name, v));
            }
        }
        decls.join("; ")
    }
}

/// Pure projection from format flags to visual attributes.
pub fn style_for_cell(format: &CellFormat) -> CellStyle {
    let mut decorations = Vec::new();
    if format.underline {
        decorations.push("underline");
    }
    if format.strikethrough {
        decorations.push("line-through");
    }
    let border = |on: bool| on.then_some(BORDER_CSS);

    CellStyle {
        font_weight: if format.bold { "bold" } else { "normal" },
        font_style: if format.italic { "italic" } else { "normal" },
        text_decoration: (!decorations.is_empty()).then(|| decorations.join(" ")),
        color: format.text_color.clone(),
        background_color: format.fill_color.clone(),
        text_align: format.alignment.map(Alignment::as_css),
        border_top: border(format.borders.top),
        border_right: border(format.borders.right),
        border_bottom: border(format.borders.bottom),
        border_left: border(format.borders.left),
    }
}

/// Display text for a value under a format.
///
/// A date style is tried first and wins whenever the value can be read as a
/// date; number styles apply only after that; anything else shows its raw
/// display string.
pub fn format_for_display(value: &CellValue, format: &CellFormat) -> String {
    if let Some(style) = format.date_style
        && let Some(formatted) = format_as_date(value, style)
    {
        return formatted;
    }

    if !format.number.is_general()
        && !matches!(value, CellValue::Date(_))
        && let Some(n) = value.as_number()
    {
        return format_styled_number(n, &format.number);
    }

    value.display_string()
}

fn format_as_date(value: &CellValue, style: DateStyle) -> Option<String> {
    let date = match value {
        CellValue::Date(d) => match d.serial {
            Some(serial) => serial_to_date(serial),
            None => parse_date_input(&d.display),
        },
        CellValue::Number(n) => serial_to_date(*n),
        CellValue::Text(s) => {
            parse_date_input(s).or_else(|| s.trim().parse::<f64>().ok().and_then(serial_to_date))
        }
        _ => None,
    }?;
    Some(date.format(style.pattern()).to_string())
}

/// Apply percent, currency, comma grouping and fixed decimals.
pub fn format_styled_number(n: f64, style: &NumberStyle) -> String {
    if let Some(special) = non_finite_marker(n) {
        return special;
    }
    let decimals = style.decimals_or_default();

    if style.percent {
        return format!("{}%", fixed(n * 100.0, decimals, style.comma));
    }
    if let Some(symbol) = &style.currency {
        return money_string(n, symbol, decimals);
    }
    fixed(n, decimals, style.comma)
}

/// `-$1,234.50` style currency text. Currency always groups thousands.
pub fn money_string(n: f64, symbol: &str, decimals: usize) -> String {
    if let Some(special) = non_finite_marker(n) {
        return special;
    }
    let sign = if n < 0.0 { "-" } else { "" };
    format!("{}{}{}", sign, symbol, fixed(n.abs(), decimals, true))
}

/// Fixed number of decimal places (always prints trailing zeros).
pub fn fixed_decimal_string(n: f64, decimals: usize) -> String {
    if let Some(special) = non_finite_marker(n) {
        return special;
    }
    format!("{:.*}", decimals, n)
}

fn fixed(n: f64, decimals: usize, comma: bool) -> String {
    let s = fixed_decimal_string(n, decimals);
    if comma { group_thousands(&s) } else { s }
}

/// Insert `,` separators into the integer part of a plain decimal string.
pub fn group_thousands(s: &str) -> String {
    let (sign, unsigned) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

fn non_finite_marker(n: f64) -> Option<String> {
    if n.is_nan() {
        Some("#NAN!".to_string())
    } else if n.is_infinite() {
        Some("#INF!".to_string())
    } else {
        None
    }
}

/// Format a number for general display: integers without decimals, other
/// values with up to ten decimals and no trailing zeros.
pub fn format_number(n: f64) -> String {
    if let Some(special) = non_finite_marker(n) {
        return special;
    }
    let s = if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        let s = format!("{:.10}", n);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    };
    if s == "-0" { "0".to_string() } else { s }
}

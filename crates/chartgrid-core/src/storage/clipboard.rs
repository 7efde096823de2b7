//! Clipboard text parsing and the clipboard fallback chain.
//!
//! Pasted text arrives either tab-delimited (from a spreadsheet) or as CSV.
//! [`parse_paste_buffer`] turns it into rows of fields; the document writes
//! those fields into the grid. Reading the clipboard goes through an ordered
//! list of [`ClipboardSource`]s and finally the last text we copied ourselves.

use chartgrid_engine::engine::{CellRef, CellValue};

/// Split pasted text into rows of fields.
///
/// Lines split on `\n` (a trailing `\r` is dropped, as is one empty line left
/// by a final newline). If any line holds a tab the whole buffer is
/// tab-delimited; otherwise each line goes through the quote-aware CSV
/// scanner in [`split_csv_line`].
pub fn parse_paste_buffer(text: &str) -> Vec<Vec<String>> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    if lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    if lines.iter().any(|line| line.contains('\t')) {
        lines
            .iter()
            .map(|line| line.split('\t').map(str::to_string).collect())
            .collect()
    } else {
        lines.iter().map(|line| split_csv_line(line)).collect()
    }
}

/// One line of CSV. `"` toggles quoting, `""` inside quotes is a literal
/// quote, `,` outside quotes ends a field. An unterminated quote runs to the
/// end of the line.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Drop one layer of wrapping double quotes, if the field has them.
pub fn strip_enclosing_quotes(field: &str) -> &str {
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field)
}

/// Something that can hand over clipboard text.
pub trait ClipboardSource {
    fn name(&self) -> &str;

    /// Current clipboard text, if this source can read it.
    fn get_text(&mut self) -> Option<String>;

    /// Replace the clipboard text. Returns false when unsupported or failed.
    fn set_text(&mut self, _text: String) -> bool {
        false
    }
}

/// A clipboard that lives in memory. Also stands in for event-supplied data.
#[derive(Clone, Debug, Default)]
pub struct MemoryClipboard {
    text: Option<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

impl ClipboardSource for MemoryClipboard {
    fn name(&self) -> &str {
        "memory"
    }

    fn get_text(&mut self) -> Option<String> {
        self.text.clone()
    }

    fn set_text(&mut self, text: String) -> bool {
        self.text = Some(text);
        true
    }
}

/// OS clipboard through arboard.
#[cfg(feature = "system-clipboard")]
#[derive(Debug, Default)]
pub struct SystemClipboard;

#[cfg(feature = "system-clipboard")]
impl ClipboardSource for SystemClipboard {
    fn name(&self) -> &str {
        "system"
    }

    fn get_text(&mut self) -> Option<String> {
        let mut cb = arboard::Clipboard::new().ok()?;
        cb.get_text().ok()
    }

    fn set_text(&mut self, text: String) -> bool {
        let mut cb = match arboard::Clipboard::new() {
            Ok(cb) => cb,
            Err(_) => return false,
        };
        cb.set_text(text).is_ok()
    }
}

/// Ordered clipboard sources, tried first to last, then the last text we
/// wrote. Sources that fail or come back empty are skipped.
#[derive(Default)]
pub struct ClipboardChain {
    sources: Vec<Box<dyn ClipboardSource>>,
    last_known: Option<String>,
}

impl std::fmt::Debug for ClipboardChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipboardChain")
            .field(
                "sources",
                &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("last_known", &self.last_known.is_some())
            .finish()
    }
}

impl ClipboardChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// The platform clipboard when built with `system-clipboard`, else empty.
    pub fn system() -> Self {
        #[cfg(feature = "system-clipboard")]
        {
            Self::new().with_source(SystemClipboard)
        }
        #[cfg(not(feature = "system-clipboard"))]
        {
            Self::new()
        }
    }

    pub fn with_source(mut self, source: impl ClipboardSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn push_source(&mut self, source: Box<dyn ClipboardSource>) {
        self.sources.push(source);
    }

    pub fn last_known(&self) -> Option<&str> {
        self.last_known.as_deref()
    }

    /// First non-empty text from the chain.
    pub fn read(&mut self) -> Option<String> {
        for source in &mut self.sources {
            match source.get_text() {
                Some(text) if !text.is_empty() => return Some(text),
                _ => log::debug!("clipboard source {} had nothing", source.name()),
            }
        }
        self.last_known.clone()
    }

    /// Remember `text` and offer it to every source. Returns whether any
    /// source took it.
    pub fn write(&mut self, text: &str) -> bool {
        self.last_known = Some(text.to_string());
        let mut stored = false;
        for source in &mut self.sources {
            stored |= source.set_text(text.to_string());
        }
        stored
    }
}

/// What a copied cell carries.
#[derive(Clone, Debug, PartialEq)]
pub enum ClipCell {
    Value(CellValue),
    /// Raw formula text; references shift when pasted elsewhere.
    Formula(String),
}

impl ClipCell {
    /// Text form used on the system clipboard.
    pub fn to_text(&self) -> String {
        match self {
            ClipCell::Value(value) => value.display_string(),
            ClipCell::Formula(formula) => formula.clone(),
        }
    }

    pub fn is_chart_occupied(&self) -> bool {
        matches!(self, ClipCell::Value(CellValue::ChartOccupied))
    }
}

/// A rectangular block copied out of a sheet, relative to `origin`.
#[derive(Clone, Debug, PartialEq)]
pub struct CellBlock {
    pub origin: CellRef,
    /// (row offset, col offset, content)
    pub cells: Vec<(usize, usize, ClipCell)>,
    pub width: usize,
    pub height: usize,
}

impl CellBlock {
    pub fn new(origin: CellRef) -> Self {
        Self {
            origin,
            cells: Vec::new(),
            width: 0,
            height: 0,
        }
    }

    pub fn add_cell(&mut self, row: usize, col: usize, content: ClipCell) {
        self.cells.push((row, col, content));
        self.width = self.width.max(col + 1);
        self.height = self.height.max(row + 1);
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Tab-separated text, one line per row. Charts use their wire strings.
    ///
    /// The text must paste back into the same cells through
    /// [`parse_paste_buffer`]: tabs and line breaks inside a field become
    /// spaces, a field wrapped in quotes gets one extra layer, and a single
    /// column (which pastes as CSV) quotes fields holding `,` or `"`.
    pub fn to_text(&self) -> String {
        let csv = self.width == 1;
        let mut grid = vec![vec![String::new(); self.width]; self.height];
        for (row, col, content) in &self.cells {
            grid[*row][*col] = clipboard_field(&content.to_text(), csv);
        }
        grid.iter()
            .map(|row| row.join("\t"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn clipboard_field(text: &str, csv: bool) -> String {
    let mut field = text.replace("\r\n", " ").replace(['\t', '\r', '\n'], " ");
    if field.len() >= 2 && field.starts_with('"') && field.ends_with('"') {
        field = format!("\"{}\"", field);
    }
    if csv && field.contains([',', '"']) {
        field = format!("\"{}\"", field.replace('"', "\"\""));
    }
    field
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rows(lines: &[&[&str]]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|line| line.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_csv_with_quoted_comma() {
        assert_eq!(
            parse_paste_buffer("a,\"b,c\",d\ne,f,g"),
            rows(&[&["a", "b,c", "d"], &["e", "f", "g"]])
        );
    }

    #[test]
    fn test_tab_anywhere_makes_buffer_tsv() {
        assert_eq!(
            parse_paste_buffer("a\tb,c\nd"),
            rows(&[&["a", "b,c"], &["d"]])
        );
    }

    #[test]
    fn test_crlf_and_trailing_newline() {
        assert_eq!(
            parse_paste_buffer("1,2\r\n3,4\r\n"),
            rows(&[&["1", "2"], &["3", "4"]])
        );
        assert!(parse_paste_buffer("").is_empty());
    }

    #[test]
    fn test_doubled_quotes_and_unterminated_quote() {
        assert_eq!(split_csv_line(r#""say ""hi""",x"#), vec![r#"say "hi""#, "x"]);
        assert_eq!(split_csv_line(r#"a,"b,c"#), vec!["a", "b,c"]);
        assert_eq!(split_csv_line(r#""",x"#), vec!["", "x"]);
    }

    #[test]
    fn test_strip_enclosing_quotes() {
        assert_eq!(strip_enclosing_quotes("\"x\""), "x");
        assert_eq!(strip_enclosing_quotes("\"\"x\"\""), "\"x\"");
        assert_eq!(strip_enclosing_quotes("\"x"), "\"x");
        assert_eq!(strip_enclosing_quotes("\""), "\"");
    }

    struct Broken;

    impl ClipboardSource for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn get_text(&mut self) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_chain_falls_through_to_next_source() {
        let mut chain = ClipboardChain::new()
            .with_source(Broken)
            .with_source(MemoryClipboard::with_text(""))
            .with_source(MemoryClipboard::with_text("x\ty"));
        assert_eq!(chain.read().as_deref(), Some("x\ty"));
    }

    #[test]
    fn test_chain_falls_back_to_last_known() {
        let mut chain = ClipboardChain::new().with_source(Broken);
        assert_eq!(chain.read(), None);
        assert!(!chain.write("copied"));
        assert_eq!(chain.read().as_deref(), Some("copied"));
        assert_eq!(chain.last_known(), Some("copied"));
    }

    #[test]
    fn test_block_to_text_keeps_chart_wire_strings() {
        let mut block = CellBlock::new(CellRef::new(0, 0));
        block.add_cell(0, 0, ClipCell::Value(CellValue::text("a")));
        block.add_cell(0, 1, ClipCell::Value(CellValue::ChartOccupied));
        block.add_cell(1, 1, ClipCell::Formula("=A1".to_string()));
        assert_eq!((block.width, block.height), (2, 2));
        assert_eq!(block.to_text(), "a\tCHART:OCCUPIED\n\t=A1");
    }

    fn pasted_back(block: &CellBlock) -> Vec<Vec<String>> {
        parse_paste_buffer(&block.to_text())
            .iter()
            .map(|row| row.iter().map(|f| strip_enclosing_quotes(f).to_string()).collect())
            .collect()
    }

    #[test]
    fn test_block_text_flattens_tabs_and_line_breaks() {
        let mut block = CellBlock::new(CellRef::new(0, 0));
        block.add_cell(0, 0, ClipCell::Value(CellValue::text("a\tb")));
        block.add_cell(0, 1, ClipCell::Value(CellValue::text("c")));
        block.add_cell(1, 0, ClipCell::Value(CellValue::text("two\r\nlines\n")));
        assert_eq!(block.to_text(), "a b\tc\ntwo lines \t");
        assert_eq!(
            pasted_back(&block),
            rows(&[&["a b", "c"], &["two lines ", ""]])
        );
    }

    #[test]
    fn test_block_text_keeps_quotes_and_commas() {
        let mut wide = CellBlock::new(CellRef::new(0, 0));
        wide.add_cell(0, 0, ClipCell::Value(CellValue::text("\"quoted\"")));
        wide.add_cell(0, 1, ClipCell::Value(CellValue::text("x,y")));
        assert_eq!(pasted_back(&wide), rows(&[&["\"quoted\"", "x,y"]]));

        let mut column = CellBlock::new(CellRef::new(0, 0));
        column.add_cell(0, 0, ClipCell::Value(CellValue::text("x,y")));
        column.add_cell(1, 0, ClipCell::Value(CellValue::text("\"quoted\"")));
        column.add_cell(2, 0, ClipCell::Formula("=CONCAT(\"a\", \"b\")".to_string()));
        assert_eq!(
            pasted_back(&column),
            rows(&[&["x,y"], &["\"quoted\""], &["=CONCAT(\"a\", \"b\")"]])
        );
    }
}

use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Row selectors in preference order, each with the match count it must reach.
/// The first match is always the header row.
pub const ROW_SELECTORS: &[(&str, usize)] = &[
    ("table tbody tr", 2),
    ("tbody tr", 2),
    ("table tr", 2),
    (r#"[role="table"] [role="row"]"#, 2),
    (".table-row", 2),
    ("tr", 2),
];

const CELL_SELECTOR: &str = r#"td, [role="cell"]"#;

#[derive(Debug, Error)]
pub enum RowError {
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("row has no cell at index {0}")]
    MissingCell(usize),
}

/// Owned snapshot of one element found inside a row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Visible text, whitespace collapsed
    pub text: String,
    attrs: BTreeMap<String, String>,
}

impl Element {
    /// Attribute value, `None` when missing or blank
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn from_ref(el: ElementRef<'_>) -> Self {
        Self {
            text: visible_text(el),
            attrs: el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// One rendered result row: positional cells plus descendant search
pub trait RowHandle {
    fn cell_count(&self) -> usize;

    /// Trimmed visible text of cell `index`
    fn cell_text(&self, index: usize) -> Result<String, RowError>;

    /// Elements under cell `index` matching a CSS selector, in document order
    fn find_in_cell(&self, index: usize, selector: &str) -> Result<Vec<Element>, RowError>;

    /// Elements anywhere under the row matching a CSS selector
    fn find_in_row(&self, selector: &str) -> Result<Vec<Element>, RowError>;
}

/// `RowHandle` over a row of a parsed `scraper` document
pub struct HtmlRow<'a> {
    row: ElementRef<'a>,
    cells: Vec<ElementRef<'a>>,
}

impl<'a> HtmlRow<'a> {
    pub fn new(row: ElementRef<'a>) -> Result<Self, RowError> {
        let cell_selector = parse_selector(CELL_SELECTOR)?;
        let cells = row.select(&cell_selector).collect();
        Ok(Self { row, cells })
    }

    fn cell(&self, index: usize) -> Result<ElementRef<'a>, RowError> {
        self.cells.get(index).copied().ok_or(RowError::MissingCell(index))
    }
}

impl RowHandle for HtmlRow<'_> {
    fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn cell_text(&self, index: usize) -> Result<String, RowError> {
        self.cell(index).map(visible_text)
    }

    fn find_in_cell(&self, index: usize, selector: &str) -> Result<Vec<Element>, RowError> {
        let selector = parse_selector(selector)?;
        Ok(self.cell(index)?.select(&selector).map(Element::from_ref).collect())
    }

    fn find_in_row(&self, selector: &str) -> Result<Vec<Element>, RowError> {
        let selector = parse_selector(selector)?;
        Ok(self.row.select(&selector).map(Element::from_ref).collect())
    }
}

/// Data rows of a results page, found by the first selector in
/// `ROW_SELECTORS` that reaches its minimum. The header row is skipped.
pub fn enumerate_rows(document: &Html) -> Option<(&'static str, Vec<HtmlRow<'_>>)> {
    for (selector, min_rows) in ROW_SELECTORS {
        let parsed = match parse_selector(selector) {
            Ok(s) => s,
            Err(e) => {
                debug!("Skipping row selector: {}", e);
                continue;
            }
        };

        let matched: Vec<ElementRef> = document.select(&parsed).collect();
        if matched.len() < *min_rows {
            continue;
        }

        let rows = matched
            .into_iter()
            .skip(1)
            .filter_map(|el| HtmlRow::new(el).ok())
            .collect();
        return Some((*selector, rows));
    }

    None
}

pub fn parse_selector(selector: &str) -> Result<Selector, RowError> {
    Selector::parse(selector).map_err(|e| RowError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn visible_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body><table>
        <thead><tr><th>Photo</th><th>Description</th></tr></thead>
        <tbody>
          <tr><td>header-ish</td><td>skip me</td></tr>
          <tr>
            <td><img src="/img/1.jpg"></td>
            <td><a href="/item/1">  Cat
               Tower </a></td>
            <td>B0001</td>
          </tr>
        </tbody>
    </table></body></html>"#;

    #[test]
    fn first_matching_selector_wins_and_header_is_skipped() {
        let doc = Html::parse_document(PAGE);
        let (selector, rows) = enumerate_rows(&doc).unwrap();

        assert_eq!(selector, "table tbody tr");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cell_count(), 3);
    }

    #[test]
    fn cell_text_collapses_whitespace() {
        let doc = Html::parse_document(PAGE);
        let (_, rows) = enumerate_rows(&doc).unwrap();

        assert_eq!(rows[0].cell_text(1).unwrap(), "Cat Tower");
        assert!(matches!(rows[0].cell_text(9), Err(RowError::MissingCell(9))));
    }

    #[test]
    fn descendants_expose_attributes() {
        let doc = Html::parse_document(PAGE);
        let (_, rows) = enumerate_rows(&doc).unwrap();

        let links = rows[0].find_in_cell(1, "a").unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].attr("href"), Some("/item/1"));
        assert_eq!(links[0].attr("title"), None);

        let images = rows[0].find_in_row("img").unwrap();
        assert_eq!(images[0].attr("src"), Some("/img/1.jpg"));
    }

    #[test]
    fn bad_selector_is_an_error_not_a_panic() {
        let doc = Html::parse_document(PAGE);
        let (_, rows) = enumerate_rows(&doc).unwrap();
        assert!(matches!(
            rows[0].find_in_row("a[["),
            Err(RowError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn role_based_rows_are_found_when_there_is_no_table() {
        let html = r#"<div role="table">
            <div role="row"><span role="cell">Photo</span></div>
            <div role="row"><span role="cell">a</span><span role="cell">b</span></div>
        </div>"#;
        let doc = Html::parse_document(html);
        let (selector, rows) = enumerate_rows(&doc).unwrap();

        assert_eq!(selector, r#"[role="table"] [role="row"]"#);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cell_count(), 2);
    }

    #[test]
    fn page_with_only_a_header_has_no_rows() {
        let doc = Html::parse_document("<table><tr><th>Photo</th></tr></table>");
        assert!(enumerate_rows(&doc).is_none());
    }
}

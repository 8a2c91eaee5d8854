//! Entry ↔ spreadsheet row mapping.
//!
//! Sheet layout: header `[key, lang1..langN, mark]`, data rows
//! `["[module][key]", ...values, mark]`. One reserved column after `mark`
//! holds transient lock tokens during an incremental apply. The compound key
//! component stays fixed even when the English text it once came from is
//! edited remotely; key stability must survive content edits.

use crate::catalog::{Catalog, Entry, format_compound_key, parse_compound_key};

/// One remote row, addressed by its compound key. `values` holds the cells
/// after the key column: language values in layout order, then `mark`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub compound_key: String,
    pub values: Vec<String>,
}

impl Row {
    /// Full cell vector as stored in the sheet (key column included).
    pub fn cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(self.values.len() + 1);
        cells.push(self.compound_key.clone());
        cells.extend(self.values.iter().cloned());
        cells
    }
}

/// Column layout derived from the configured language list.
#[derive(Debug, Clone)]
pub struct SheetLayout {
    languages: Vec<String>,
}

impl SheetLayout {
    pub fn new(languages: &[String]) -> Self {
        Self {
            languages: languages.to_vec(),
        }
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn header(&self) -> Vec<String> {
        let mut header = Vec::with_capacity(self.languages.len() + 2);
        header.push("key".to_string());
        header.extend(self.languages.iter().cloned());
        header.push("mark".to_string());
        header
    }

    /// Zero-based index of the `mark` column.
    pub fn mark_column(&self) -> usize {
        1 + self.languages.len()
    }

    /// Zero-based index of the reserved lock-token column.
    pub fn lock_column(&self) -> usize {
        self.mark_column() + 1
    }

    pub fn entry_to_row(&self, module: &str, key: &str, entry: &Entry) -> Row {
        let mut values = Vec::with_capacity(self.languages.len() + 1);
        for lang in &self.languages {
            values.push(entry.value(lang).unwrap_or_default().to_string());
        }
        values.push(entry.mark.to_string());
        Row {
            compound_key: format_compound_key(module, key),
            values,
        }
    }

    /// Parse one sheet row. Cells beyond the mark column (the lock column)
    /// are ignored; missing language cells read as empty and stay absent
    /// from the entry so local values survive the remote merge.
    pub fn row_to_entry(&self, cells: &[String]) -> anyhow::Result<(String, String, Entry)> {
        let compound = cells
            .first()
            .ok_or_else(|| anyhow::anyhow!("Empty sheet row"))?;
        let (module, key) = parse_compound_key(compound)?;

        let mut entry = Entry::default();
        for (idx, lang) in self.languages.iter().enumerate() {
            if let Some(text) = cells.get(idx + 1) {
                if !text.is_empty() {
                    entry.values.insert(lang.clone(), text.clone());
                }
            }
        }
        entry.mark = cells
            .get(self.mark_column())
            .and_then(|cell| cell.parse().ok())
            .unwrap_or(0);
        Ok((module, key, entry))
    }

    /// Convert fetched data rows into a catalog, skipping malformed rows.
    /// Returns the catalog and the number of rows skipped.
    pub fn rows_to_catalog(&self, rows: &[Vec<String>]) -> (Catalog, usize) {
        let mut catalog = Catalog::new();
        let mut skipped = 0;
        for cells in rows {
            match self.row_to_entry(cells) {
                Ok((module, key, entry)) => catalog.insert(module, key, entry),
                Err(_) => skipped += 1,
            }
        }
        (catalog, skipped)
    }

    pub fn catalog_to_rows(&self, catalog: &Catalog) -> Vec<Row> {
        catalog
            .modules()
            .flat_map(|(module, entries)| {
                entries
                    .iter()
                    .map(|(key, entry)| self.entry_to_row(module, key, entry))
            })
            .collect()
    }
}

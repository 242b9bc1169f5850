//! Fixed-list CSV viewer
//!
//! Files are stored in Windows-1252 and rendered as plain-text tables.
//! A file that is missing or malformed is reported on its own and
//! never stops the rest of the list from loading.

use std::path::{Path, PathBuf};
use log::{debug, warn};

pub const CSV_FILES: [&str; 10] = [
  "sales.csv"
, "customers.csv"
, "products.csv"
, "orders.csv"
, "inventory.csv"
, "suppliers.csv"
, "employees.csv"
, "regions.csv"
, "returns.csv"
, "pricing.csv"
];

/// Parsed CSV contents
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table
{   pub headers: Vec<String>
  , pub rows: Vec<Vec<String>>
}

/// Load outcome for one file of the list
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome
{   Loaded(Table)
  , Failed(crate::error::Error)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFile
{   pub name: String
  , pub path: PathBuf
  , pub outcome: FileOutcome
}

/// Load every file in `CSV_FILES` from `dir`
pub fn load_all(dir: &Path) -> Vec<LoadedFile>
{   load_files(dir, &CSV_FILES)
}

pub fn load_files(dir: &Path, names: &[&str]) -> Vec<LoadedFile>
{   names.iter()
      .map(|name| {
        let path = dir.join(name);
        let outcome = match load_table(&path)
        {   Ok(table) => {
              debug!(
                "Loaded {} ({} rows)",
                path.display(), table.rows.len()
              );
              FileOutcome::Loaded(table)
            }
          , Err(e) => {
              warn!("Skipping {}: {}", path.display(), e);
              FileOutcome::Failed(e)
            }
        };
        LoadedFile
        {   name: name.to_string()
          , path
          , outcome
        }
      })
      .collect()
}

pub fn load_table(path: &Path) -> Result<Table, crate::error::Error>
{   let bytes = std::fs::read(path).map_err(|e| {
      crate::error::Error::Csv(format!("{}: {}", path.display(), e))
    })?;
    parse_table(&bytes)
}

/// Decode Windows-1252 bytes and parse them as CSV with a header row
pub fn parse_table(bytes: &[u8]) -> Result<Table, crate::error::Error>
{   // No BOM sniffing: leading 0xFF 0xFE is "ÿþ", not UTF-16
    let (text, _) = encoding_rs::WINDOWS_1252
      .decode_without_bom_handling(bytes);

    let mut reader = csv::ReaderBuilder::new()
      .has_headers(true)
      .flexible(true)
      .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?
      .iter()
      .map(str::to_string)
      .collect();
    if headers.is_empty()
    {   return Err(crate::error::Error::Csv(
          "file has no header row".to_string()
        ));
    }

    let mut rows = Vec::new();
    for record in reader.records()
    {   let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table
    {   headers
      , rows
    })
}

impl Table
{   /// Aligned text table; `max_rows` truncates with a trailer line
    pub fn render(&self, max_rows: Option<usize>) -> String
    {   let shown = max_rows
          .unwrap_or(self.rows.len())
          .min(self.rows.len());
        let columns = self.rows[..shown]
          .iter()
          .map(Vec::len)
          .chain(std::iter::once(self.headers.len()))
          .max()
          .unwrap_or(0);

        let mut widths = vec![0usize; columns];
        let all_rows = std::iter::once(&self.headers)
          .chain(self.rows[..shown].iter());
        for row in all_rows
        {   for (i, cell) in row.iter().enumerate()
            {   widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let mut out = String::new();
        out.push_str(&render_row(&self.headers, &widths));
        out.push('\n');
        out.push_str(
          &widths.iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-")
        );
        out.push('\n');
        for row in &self.rows[..shown]
        {   out.push_str(&render_row(row, &widths));
            out.push('\n');
        }
        if shown < self.rows.len()
        {   out.push_str(&format!(
              "... {} more row(s)\n",
              self.rows.len() - shown
            ));
        }
        out
    }
}

fn render_row(cells: &[String], widths: &[usize]) -> String
{   widths.iter()
      .enumerate()
      .map(|(i, w)| {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let pad = w.saturating_sub(cell.chars().count());
        format!("{}{}", cell, " ".repeat(pad))
      })
      .collect::<Vec<_>>()
      .join(" | ")
      .trim_end()
      .to_string()
}

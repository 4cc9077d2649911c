//! Loading a Bitwave actions export into a header-indexed table.
//!
//! CSV and spreadsheet inputs are both normalised to text cells so the
//! extraction code sees a single shape. Header names are compared after
//! trimming: Bitwave pads some of them (`" proceeds "`).

use std::{fs::File, io::Read, path::Path};

use anyhow::Context;
use calamine::{open_workbook_auto, Data, Reader};
use tracing::{debug, info, warn};

use crate::{
    error::ConvertError,
    timestamp::{from_excel_serial, to_canonical},
    Result,
};

pub const ACTION: &str = "action";
pub const ASSET: &str = "asset";
pub const TIMESTAMP: &str = "timestamp";
pub const LOT_ID: &str = "lotId";
pub const PROCEEDS: &str = "proceeds";
pub const COST_BASIS_RELIEVED: &str = "costBasisRelieved";
pub const SHORT_TERM_GAIN_LOSS: &str = "shortTermGainLoss";
pub const LONG_TERM_GAIN_LOSS: &str = "longTermGainLoss";

pub const REQUIRED_COLUMNS: [&str; 6] = [
    ACTION,
    ASSET,
    TIMESTAMP,
    LOT_ID,
    PROCEEDS,
    COST_BASIS_RELIEVED,
];

#[derive(Debug, Clone, Default)]
pub struct ActionsTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ActionsTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = headers
            .into_iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|cells| Row { cells })
    }
}

/// A borrowed data row. Short rows read as empty cells.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    cells: &'a [String],
}

impl<'a> Row<'a> {
    pub fn get(&self, column: usize) -> &'a str {
        self.cells.get(column).map(|c| c.trim()).unwrap_or("")
    }

    pub fn get_opt(&self, column: Option<usize>) -> &'a str {
        column.map(|c| self.get(c)).unwrap_or("")
    }
}

/// Column positions of an actions report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionColumns {
    pub action: usize,
    pub asset: usize,
    pub timestamp: usize,
    pub lot_id: usize,
    pub proceeds: usize,
    pub cost_basis: usize,
    pub short_term_gain_loss: Option<usize>,
    pub long_term_gain_loss: Option<usize>,
}

impl ActionColumns {
    /// Locates every required column, failing with the full list of the
    /// ones that are absent.
    pub fn resolve(table: &ActionsTable) -> std::result::Result<Self, ConvertError> {
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| table.column(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConvertError::MissingColumns(missing));
        }

        let required = |name: &str| {
            table
                .column(name)
                .ok_or_else(|| ConvertError::MissingColumns(vec![name.to_string()]))
        };
        Ok(Self {
            action: required(ACTION)?,
            asset: required(ASSET)?,
            timestamp: required(TIMESTAMP)?,
            lot_id: required(LOT_ID)?,
            proceeds: required(PROCEEDS)?,
            cost_basis: required(COST_BASIS_RELIEVED)?,
            short_term_gain_loss: table.column(SHORT_TERM_GAIN_LOSS),
            long_term_gain_loss: table.column(LONG_TERM_GAIN_LOSS),
        })
    }
}

/// Loads an actions export, choosing the reader from the file extension.
pub fn load_table<P: AsRef<Path>>(file_path: P) -> Result<ActionsTable> {
    let path = file_path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let table = match extension.as_str() {
        "csv" | "txt" => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            read_csv(file)?
        }
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_spreadsheet(path)?,
        other => return Err(ConvertError::UnsupportedInput(other.to_string()).into()),
    };

    info!(
        "Loaded {} actions from {}",
        table.len(),
        path.to_string_lossy()
    );
    Ok(table)
}

pub fn read_csv<R: Read>(reader: R) -> Result<ActionsTable> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()
        .context("failed to read CSV headers")?
        .iter()
        .map(str::to_string)
        .collect();
    debug!("CSV headers: {:?}", headers);

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        match record {
            Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
            // header is line 1
            Err(e) => warn!("Skipping unreadable CSV line {}: {}", idx + 2, e),
        }
    }
    Ok(ActionsTable::new(headers, rows))
}

fn read_spreadsheet(path: &Path) -> Result<ActionsTable> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open spreadsheet {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ConvertError::EmptyWorkbook)?
        .context("failed to read the first worksheet")?;

    let headers = range.headers().context("failed to extract headers")?;
    let rows = range
        .rows()
        .skip(1)
        .map(|r| r.iter().map(cell_to_string).collect())
        .collect();
    Ok(ActionsTable::new(headers, rows))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => from_excel_serial(dt.as_f64())
            .and_then(|ts| to_canonical(ts).ok())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

//! Failure kinds surfaced to the user.
//!
//! Anything not listed here travels as a plain `anyhow::Error` with context
//! attached at the call site.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("this doesn't appear to be a valid Bitwave actions report; missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("unsupported input file type: {0}")]
    UnsupportedInput(String),

    #[error("the spreadsheet has no worksheet")]
    EmptyWorkbook,

    #[error("no sell transactions found in the file")]
    NoSales,

    #[error("no sell transactions found for {0}, please check the selected tax year")]
    NoTransactions(i32),

    #[error("taxpayer name and social security number are required to generate a PDF")]
    MissingTaxpayer,
}

pub type Result<T> = anyhow::Result<T>;

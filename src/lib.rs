//! Converts a Bitwave actions export into IRS Form 8949 output: a CSV for
//! tax software import or filled PDF pages.

use std::path::Path;

use tracing::info;

pub mod bundle;
pub mod config;
pub mod currency;
pub mod error;
pub mod export;
pub mod form;
pub mod input;
pub mod logging;
pub mod summary;
pub mod template;
pub mod timestamp;
pub mod transactions;

pub use error::{ConvertError, Result};
pub use transactions::{Term, Transaction};

use input::{load_table, ActionColumns};
use transactions::{extract_transactions, latest_sale_year};

/// Reads the export and returns the sales of `tax_year`, or of the latest
/// year with a sale when none is given, along with the year used.
pub fn get_transactions<P: AsRef<Path>>(
    file_path: P,
    tax_year: Option<i32>,
) -> Result<(i32, Vec<Transaction>)> {
    let table = load_table(file_path)?;
    let columns = ActionColumns::resolve(&table)?;

    let year = tax_year
        .or_else(|| latest_sale_year(&table, &columns))
        .ok_or(ConvertError::NoSales)?;
    if tax_year.is_none() {
        info!("No tax year given, using {} from the latest sale", year);
    }

    let transactions = extract_transactions(&table, &columns, year);
    if transactions.is_empty() {
        return Err(ConvertError::NoTransactions(year).into());
    }
    Ok((year, transactions))
}

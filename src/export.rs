//! Form 8949 rows as CSV for tax software import (TurboTax, TaxAct, ...).

use std::path::Path;

use anyhow::{anyhow, Context};
use tracing::info;

use crate::{timestamp::form_date, transactions::Transaction, Result};

pub const CSV_HEADER: [&str; 8] = [
    "Description",
    "Date Acquired",
    "Date Sold",
    "Sales Price",
    "Cost Basis",
    "Gain/Loss",
    "Adjustment Code",
    "Adjustment Amount",
];

/// Printed when the acquisition date of a sale is unknown.
pub const VARIOUS: &str = "VARIOUS";

pub fn csv_file_name(tax_year: i32) -> String {
    format!("form_8949_{}_bitwave_transactions.csv", tax_year)
}

pub fn tax_software_csv(transactions: &[Transaction]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(CSV_HEADER)?;
    for t in transactions {
        let date_acquired = match t.date_acquired {
            Some(d) => form_date(d)?,
            None => VARIOUS.to_string(),
        };
        wtr.write_record(&[
            t.description.clone(),
            date_acquired,
            form_date(t.date_sold)?,
            format!("{:.2}", t.proceeds),
            format!("{:.2}", t.cost_basis),
            format!("{:.2}", t.gain_loss),
            String::new(),
            "0.00".to_string(),
        ])?;
    }
    wtr.into_inner()
        .map_err(|e| anyhow!("failed to flush CSV output: {}", e.error()))
}

pub fn write_tax_software_csv<P: AsRef<Path>>(
    transactions: &[Transaction],
    file_path: P,
) -> Result<()> {
    let data = tax_software_csv(transactions)?;
    std::fs::write(&file_path, data)
        .with_context(|| format!("failed to write {}", file_path.as_ref().display()))?;
    info!(
        "Wrote {} transactions to {}",
        transactions.len(),
        file_path.as_ref().to_string_lossy()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transactions::Term;
    use time::macros::date;

    fn sale(date_acquired: Option<time::Date>) -> Transaction {
        Transaction {
            asset: "BTC".to_string(),
            description: "BTC cryptocurrency".to_string(),
            date_acquired,
            date_sold: date!(2022-11-30),
            proceeds: 1234.5,
            cost_basis: 1300.0,
            gain_loss: -65.5,
            short_term_gain_loss: -65.5,
            long_term_gain_loss: 0.0,
            has_reported_gain_loss: false,
            term: Term::Short,
            lot_id: Some("L1".to_string()),
        }
    }

    #[test]
    fn rows_follow_the_import_layout() {
        let csv = tax_software_csv(&[sale(Some(date!(2022-01-05))), sale(None)]).unwrap();
        let text = String::from_utf8(csv).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Description,Date Acquired,Date Sold,Sales Price,Cost Basis,Gain/Loss,Adjustment Code,Adjustment Amount"
        );
        assert_eq!(
            lines[1],
            "BTC cryptocurrency,01/05/2022,11/30/2022,1234.50,1300.00,-65.50,,0.00"
        );
        assert_eq!(
            lines[2],
            "BTC cryptocurrency,VARIOUS,11/30/2022,1234.50,1300.00,-65.50,,0.00"
        );
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn writes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(csv_file_name(2022));
        write_tax_software_csv(&[sale(None)], &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("Description,"));
        assert!(path.ends_with("form_8949_2022_bitwave_transactions.csv"));
    }
}

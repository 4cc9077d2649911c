use std::collections::BTreeMap;

use crate::{
    currency::format_amount,
    timestamp::form_date,
    transactions::{Term, Transaction},
    Result,
};

/// Sales listed by [`print_transaction_details`].
pub const DETAIL_LIMIT: usize = 100;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Totals {
    pub count: usize,
    pub proceeds: f64,
    pub cost_basis: f64,
    pub gain_loss: f64,
}

impl Totals {
    pub fn of<'a, I>(transactions: I) -> Self
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        transactions.into_iter().fold(Self::default(), |acc, t| Self {
            count: acc.count + 1,
            proceeds: acc.proceeds + t.proceeds,
            cost_basis: acc.cost_basis + t.cost_basis,
            gain_loss: acc.gain_loss + t.gain_loss,
        })
    }
}

#[derive(Debug, Default)]
pub struct Summary {
    pub tax_year: i32,
    pub by_asset: BTreeMap<String, Totals>,
    pub totals: Totals,
    pub short_term_count: usize,
    pub long_term_count: usize,
    pub reconciliation_mismatches: usize,
}

impl Summary {
    pub fn has_mixed_terms(&self) -> bool {
        self.short_term_count > 0 && self.long_term_count > 0
    }
}

pub fn compute_summary(transactions: &[Transaction], tax_year: i32) -> Summary {
    let mut by_asset: BTreeMap<String, Vec<&Transaction>> = BTreeMap::new();
    for t in transactions {
        by_asset.entry(t.asset.clone()).or_default().push(t);
    }
    let short_term_count = transactions.iter().filter(|t| t.is_short_term()).count();

    Summary {
        tax_year,
        by_asset: by_asset
            .into_iter()
            .map(|(asset, txs)| (asset, Totals::of(txs)))
            .collect(),
        totals: Totals::of(transactions),
        short_term_count,
        long_term_count: transactions.len() - short_term_count,
        reconciliation_mismatches: transactions.iter().filter(|t| !t.matches_reported()).count(),
    }
}

pub fn print_summary(summary: &Summary) {
    println!("\n=== {} CRYPTO SALES SUMMARY ===\n", summary.tax_year);
    println!(
        "{:<10} {:>6} {:>18} {:>18} {:>18}",
        "Asset", "Sales", "Proceeds", "Cost Basis", "Net Gain/Loss"
    );
    for (asset, totals) in &summary.by_asset {
        println!(
            "{:<10} {:>6} {:>18} {:>18} {:>18}",
            asset,
            totals.count,
            format!("${}", format_amount(totals.proceeds)),
            format!("${}", format_amount(totals.cost_basis)),
            format!("${}", format_amount(totals.gain_loss)),
        );
    }

    println!("\nTotal proceeds: ${}", format_amount(summary.totals.proceeds));
    println!("Total cost basis: ${}", format_amount(summary.totals.cost_basis));
    println!("Net gain/loss: ${}", format_amount(summary.totals.gain_loss));
    println!(
        "\nShort-term transactions: {}\nLong-term transactions: {}",
        summary.short_term_count, summary.long_term_count
    );
    if summary.has_mixed_terms() {
        println!("Short-term and long-term sales are reported on separate Form 8949 parts.");
    }
    if summary.reconciliation_mismatches > 0 {
        println!(
            "{} transaction(s) differ from the gain/loss reported by Bitwave by more than $0.01.",
            summary.reconciliation_mismatches
        );
    }
}

/// One line per sale, the first `limit` only.
pub fn detail_rows(transactions: &[Transaction], limit: usize) -> Result<Vec<String>> {
    transactions
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, t)| {
            let bought = match t.date_acquired {
                Some(d) => form_date(d)?,
                None => "Unknown".to_string(),
            };
            let term = match t.term {
                Term::Short => "Short",
                Term::Long => "Long",
            };
            Ok(format!(
                "{:>4} {:<8} {:>10} {:>10} {:>14} {:>14} {:>14} {:<5}",
                i + 1,
                t.asset,
                form_date(t.date_sold)?,
                bought,
                format!("${:.2}", t.proceeds),
                format!("${:.2}", t.cost_basis),
                format!("${:.2}", t.gain_loss),
                term
            ))
        })
        .collect()
}

pub fn print_transaction_details(transactions: &[Transaction]) -> Result<()> {
    println!("\n=== ALL {} TRANSACTIONS ===\n", transactions.len());
    println!(
        "{:>4} {:<8} {:>10} {:>10} {:>14} {:>14} {:>14} {:<5}",
        "#", "Asset", "Sell Date", "Buy Date", "Proceeds", "Cost Basis", "Gain/Loss", "Term"
    );
    for row in detail_rows(transactions, DETAIL_LIMIT)? {
        println!("{}", row);
    }
    if transactions.len() > DETAIL_LIMIT {
        println!(
            "\nShowing first {} transactions. Total: {}",
            DETAIL_LIMIT,
            transactions.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn tx(asset: &str, proceeds: f64, cost_basis: f64, term: Term) -> Transaction {
        Transaction {
            asset: asset.to_string(),
            description: format!("{asset} cryptocurrency"),
            date_acquired: Some(date!(2022-01-01)),
            date_sold: date!(2022-06-01),
            proceeds,
            cost_basis,
            gain_loss: proceeds - cost_basis,
            short_term_gain_loss: 0.0,
            long_term_gain_loss: 0.0,
            has_reported_gain_loss: false,
            term,
            lot_id: None,
        }
    }

    #[test]
    fn totals_add_up() {
        let txs = vec![
            tx("BTC", 100.0, 40.0, Term::Short),
            tx("ETH", 10.0, 25.0, Term::Long),
            tx("BTC", 50.0, 50.0, Term::Short),
        ];
        let summary = compute_summary(&txs, 2022);
        assert_eq!(summary.totals.count, 3);
        assert_eq!(summary.totals.proceeds, 160.0);
        assert_eq!(summary.totals.cost_basis, 115.0);
        assert_eq!(summary.totals.gain_loss, 45.0);

        let btc = summary.by_asset["BTC"];
        assert_eq!(btc.count, 2);
        assert_eq!(btc.gain_loss, 60.0);
        assert_eq!(summary.by_asset["ETH"].gain_loss, -15.0);

        assert_eq!(summary.short_term_count, 2);
        assert_eq!(summary.long_term_count, 1);
        assert!(summary.has_mixed_terms());
        assert_eq!(summary.reconciliation_mismatches, 0);
    }

    #[test]
    fn detail_rows_show_unknown_buy_dates() {
        let mut unmatched = tx("SOL", 100.0, 150.0, Term::Long);
        unmatched.date_acquired = None;
        let rows = detail_rows(&[tx("BTC", 1234.5, 1000.0, Term::Short), unmatched], 10).unwrap();

        assert_eq!(rows.len(), 2);
        let first: Vec<&str> = rows[0].split_whitespace().collect();
        assert_eq!(
            first,
            vec!["1", "BTC", "06/01/2022", "01/01/2022", "$1234.50", "$1000.00", "$234.50", "Short"]
        );
        let second: Vec<&str> = rows[1].split_whitespace().collect();
        assert_eq!(second[3], "Unknown");
        assert_eq!(second[6], "$-50.00");
        assert_eq!(second[7], "Long");
    }

    #[test]
    fn detail_rows_are_capped() {
        let txs: Vec<_> = (0..DETAIL_LIMIT + 5)
            .map(|_| tx("ETH", 2.0, 1.0, Term::Short))
            .collect();
        let rows = detail_rows(&txs, DETAIL_LIMIT).unwrap();
        assert_eq!(rows.len(), DETAIL_LIMIT);
        assert!(rows[DETAIL_LIMIT - 1].trim_start().starts_with("100 "));
    }

    #[test]
    fn empty_batch_has_zero_totals() {
        let summary = compute_summary(&[], 2022);
        assert_eq!(summary.totals, Totals::default());
        assert!(!summary.has_mixed_terms());
    }
}

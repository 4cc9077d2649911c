//! Turning actions into Form 8949 transactions: lot matching, holding
//! period classification and gain/loss.

use std::{collections::HashMap, fmt};

use time::{Date, PrimitiveDateTime};
use tracing::{debug, info, warn};

use crate::{
    currency::parse_currency,
    input::{ActionColumns, ActionsTable, Row},
    timestamp::parse_timestamp,
};

/// Holding periods of this many days or fewer are short-term.
pub const SHORT_TERM_MAX_DAYS: i64 = 365;

/// Smallest reported gain/loss magnitude taken as a real value.
const REPORTED_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Short,
    Long,
}

impl Term {
    pub fn from_holding_days(days: i64) -> Self {
        if days <= SHORT_TERM_MAX_DAYS {
            Term::Short
        } else {
            Term::Long
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Short => write!(f, "Short-term"),
            Term::Long => write!(f, "Long-term"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lot {
    pub acquired: PrimitiveDateTime,
    pub asset: String,
}

pub type LotMap = HashMap<String, Lot>;

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub asset: String,
    pub description: String,
    /// `None` when the lot is unknown and the term came from the reported
    /// gain/loss split.
    pub date_acquired: Option<Date>,
    pub date_sold: Date,
    pub proceeds: f64,
    pub cost_basis: f64,
    pub gain_loss: f64,
    pub short_term_gain_loss: f64,
    pub long_term_gain_loss: f64,
    /// Whether the export had the gain/loss split columns at all.
    pub has_reported_gain_loss: bool,
    pub term: Term,
    pub lot_id: Option<String>,
}

impl Transaction {
    pub fn is_short_term(&self) -> bool {
        self.term == Term::Short
    }

    pub fn is_long_term(&self) -> bool {
        self.term == Term::Long
    }

    /// Gain/loss as reported by the export, for reconciliation.
    pub fn reported_gain_loss(&self) -> f64 {
        self.short_term_gain_loss + self.long_term_gain_loss
    }

    /// Always true when there is nothing to compare against.
    pub fn matches_reported(&self) -> bool {
        !self.has_reported_gain_loss
            || (self.gain_loss - self.reported_gain_loss()).abs() <= REPORTED_EPSILON
    }
}

/// Collects acquisition lots from every `buy` row. A lot id seen twice keeps
/// the last row.
pub fn build_lot_map(table: &ActionsTable, columns: &ActionColumns) -> LotMap {
    let mut lots = LotMap::new();
    for row in table.rows().filter(|r| is_action(r, columns, "buy")) {
        let lot_id = row.get(columns.lot_id);
        if lot_id.is_empty() {
            continue;
        }
        let Some(acquired) = parse_timestamp(row.get(columns.timestamp)) else {
            debug!("Ignoring lot {} with unparseable timestamp", lot_id);
            continue;
        };
        lots.insert(
            lot_id.to_string(),
            Lot {
                acquired,
                asset: row.get(columns.asset).to_string(),
            },
        );
    }
    debug!("Built lot map with {} lots", lots.len());
    lots
}

/// Year of the most recent parseable sell, used when no tax year is given.
pub fn latest_sale_year(table: &ActionsTable, columns: &ActionColumns) -> Option<i32> {
    table
        .rows()
        .filter(|r| is_action(r, columns, "sell"))
        .filter_map(|r| parse_timestamp(r.get(columns.timestamp)))
        .map(|ts| ts.year())
        .max()
}

/// Extracts the sells disposed of during `tax_year`.
///
/// Rows with an unparseable date, or with neither proceeds nor cost basis
/// above zero, are skipped.
pub fn extract_transactions(
    table: &ActionsTable,
    columns: &ActionColumns,
    tax_year: i32,
) -> Vec<Transaction> {
    let lots = build_lot_map(table, columns);

    let mut transactions = Vec::new();
    let mut skipped = 0usize;
    for (idx, row) in table.rows().enumerate() {
        if !is_action(&row, columns, "sell") {
            continue;
        }
        let Some(sold) = parse_timestamp(row.get(columns.timestamp)) else {
            warn!(
                "Skipping sell on row {}: unparseable timestamp {:?}",
                idx + 2,
                row.get(columns.timestamp)
            );
            skipped += 1;
            continue;
        };
        if sold.year() != tax_year {
            continue;
        }
        if let Some(t) = build_transaction(&row, columns, &lots, sold) {
            if !t.matches_reported() {
                warn!(
                    "Lot {:?} ({}): calculated gain/loss {:.2} differs from reported {:.2}",
                    t.lot_id,
                    t.asset,
                    t.gain_loss,
                    t.reported_gain_loss()
                );
            }
            transactions.push(t);
        }
    }

    info!(
        "Extracted {} sell transactions for {} ({} skipped)",
        transactions.len(),
        tax_year,
        skipped
    );
    transactions
}

fn build_transaction(
    row: &Row<'_>,
    columns: &ActionColumns,
    lots: &LotMap,
    sold: PrimitiveDateTime,
) -> Option<Transaction> {
    let proceeds = parse_currency(row.get(columns.proceeds));
    let cost_basis = parse_currency(row.get(columns.cost_basis));
    if proceeds <= 0.0 && cost_basis <= 0.0 {
        return None;
    }

    let short_term_gain_loss = parse_currency(row.get_opt(columns.short_term_gain_loss));
    let long_term_gain_loss = parse_currency(row.get_opt(columns.long_term_gain_loss));

    let lot_id = Some(row.get(columns.lot_id))
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    let lot = lot_id.as_ref().and_then(|id| lots.get(id));

    let asset = row.get(columns.asset).to_string();
    let (date_acquired, term) = match lot {
        Some(lot) => {
            if lot.asset != asset {
                debug!("Lot {:?} was bought as {} but sold as {}", lot_id, lot.asset, asset);
            }
            let holding_days = (sold - lot.acquired).whole_days();
            (Some(lot.acquired.date()), Term::from_holding_days(holding_days))
        }
        None if short_term_gain_loss.abs() > REPORTED_EPSILON => (None, Term::Short),
        None if long_term_gain_loss.abs() > REPORTED_EPSILON => (None, Term::Long),
        None => (Some(sold.date()), Term::Short),
    };

    Some(Transaction {
        description: format!("{} cryptocurrency", asset),
        asset,
        date_acquired,
        date_sold: sold.date(),
        proceeds,
        cost_basis,
        gain_loss: proceeds - cost_basis,
        short_term_gain_loss,
        long_term_gain_loss,
        has_reported_gain_loss: columns.short_term_gain_loss.is_some()
            || columns.long_term_gain_loss.is_some(),
        term,
        lot_id,
    })
}

fn is_action(row: &Row<'_>, columns: &ActionColumns, action: &str) -> bool {
    row.get(columns.action).eq_ignore_ascii_case(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::read_csv;
    use time::macros::{date, datetime};

    const HEADER: &str = "action,asset,timestamp,lotId, proceeds , costBasisRelieved , shortTermGainLoss , longTermGainLoss ";

    fn table(rows: &[&str]) -> (ActionsTable, ActionColumns) {
        let csv = std::iter::once(HEADER)
            .chain(rows.iter().copied())
            .collect::<Vec<_>>()
            .join("\n");
        let table = read_csv(csv.as_bytes()).unwrap();
        let columns = ActionColumns::resolve(&table).unwrap();
        (table, columns)
    }

    #[test]
    fn holding_period_threshold() {
        assert_eq!(Term::from_holding_days(0), Term::Short);
        assert_eq!(Term::from_holding_days(365), Term::Short);
        assert_eq!(Term::from_holding_days(366), Term::Long);
    }

    #[test]
    fn lot_older_than_a_year_is_long_term() {
        let (table, columns) = table(&[
            "buy,BTC,2020-06-01 10:00:00,L1,,,,",
            "sell,BTC,2021-06-02 10:00:00,L1,\"$50,000.00\",\"$30,000.00\",0,20000",
        ]);
        let txs = extract_transactions(&table, &columns, 2021);
        assert_eq!(txs.len(), 1);
        let t = &txs[0];
        assert!(t.is_long_term());
        assert_eq!(t.date_acquired, Some(date!(2020-06-01)));
        assert_eq!(t.date_sold, date!(2021-06-02));
        assert_eq!(t.gain_loss, 20_000.0);
        assert_eq!(t.description, "BTC cryptocurrency");
        assert_eq!(t.lot_id.as_deref(), Some("L1"));
        assert!(t.matches_reported());
    }

    #[test]
    fn exactly_365_days_is_short_term() {
        let (table, columns) = table(&[
            "buy,ETH,2021-01-01 00:00:00,L1,,,,",
            "sell,ETH,2022-01-01 00:00:00,L1,10,4,6,0",
        ]);
        let txs = extract_transactions(&table, &columns, 2022);
        assert!(txs[0].is_short_term());
    }

    #[test]
    fn partial_days_do_not_count() {
        // 365 days and 23 hours
        let (table, columns) = table(&[
            "buy,ETH,2021-01-01 00:30:00,L1,,,,",
            "sell,ETH,2022-01-01 23:30:00,L1,10,4,0,0",
        ]);
        let txs = extract_transactions(&table, &columns, 2022);
        assert!(txs[0].is_short_term());
    }

    #[test]
    fn last_buy_for_a_lot_wins() {
        let (table, columns) = table(&[
            "buy,BTC,2019-01-01,L1,,,,",
            "buy,BTC,2021-12-01,L1,,,,",
            "sell,BTC,2022-02-01,L1,10,5,0,0",
        ]);
        let lots = build_lot_map(&table, &columns);
        assert_eq!(lots["L1"].acquired, datetime!(2021-12-01 0:00));
        let txs = extract_transactions(&table, &columns, 2022);
        assert!(txs[0].is_short_term());
    }

    #[test]
    fn unmatched_lot_uses_reported_split() {
        let (table, columns) = table(&[
            "sell,SOL,2022-03-01,missing,100,40,0,60",
            "sell,SOL,2022-03-02,missing,100,40,\"(5.00)\",60",
        ]);
        let txs = extract_transactions(&table, &columns, 2022);
        assert_eq!(txs[0].term, Term::Long);
        assert_eq!(txs[0].date_acquired, None);
        // short-term wins when both are reported
        assert_eq!(txs[1].term, Term::Short);
    }

    #[test]
    fn no_lot_and_no_split_defaults_to_sale_date() {
        let (table, columns) = table(&["sell,ADA,2022-07-04 12:00:00,,100,40,0.001,0"]);
        let txs = extract_transactions(&table, &columns, 2022);
        assert_eq!(txs[0].term, Term::Short);
        assert_eq!(txs[0].date_acquired, Some(date!(2022-07-04)));
        assert_eq!(txs[0].lot_id, None);
        assert!(!txs[0].matches_reported());
    }

    #[test]
    fn zero_value_rows_are_dropped() {
        let (table, columns) = table(&[
            "sell,BTC,2022-01-10,L1,0,0,0,0",
            "sell,BTC,2022-01-11,L2,-,$0.00,0,0",
            "sell,BTC,2022-01-12,L3,0,5,0,-5",
            "sell,BTC,2022-01-13,L4,5,0,5,0",
        ]);
        let txs = extract_transactions(&table, &columns, 2022);
        let ids: Vec<_> = txs.iter().filter_map(|t| t.lot_id.as_deref()).collect();
        assert_eq!(ids, vec!["L3", "L4"]);
    }

    #[test]
    fn other_years_and_bad_rows_are_skipped() {
        let (table, columns) = table(&[
            "sell,BTC,2021-12-31,L1,10,5,5,0",
            "sell,BTC,not a date,L2,10,5,5,0",
            "SELL,BTC,2022-01-01,L3,10,5,5,0",
            "transfer,BTC,2022-01-01,L4,10,5,5,0",
        ]);
        let txs = extract_transactions(&table, &columns, 2022);
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].lot_id.as_deref(), Some("L3"));
        assert_eq!(latest_sale_year(&table, &columns), Some(2022));
    }

    #[test]
    fn reconciliation_flags_mismatches() {
        let (table, columns) = table(&["sell,BTC,2022-01-01,L1,10,5,3,0"]);
        let txs = extract_transactions(&table, &columns, 2022);
        assert!(!txs[0].matches_reported());
        assert_eq!(txs[0].reported_gain_loss(), 3.0);
    }

    #[test]
    fn zero_reported_split_is_still_reconciled() {
        let (table, columns) = table(&["sell,BTC,2022-01-01,L1,500,0,0,0"]);
        let txs = extract_transactions(&table, &columns, 2022);
        assert_eq!(txs[0].gain_loss, 500.0);
        assert_eq!(txs[0].reported_gain_loss(), 0.0);
        assert!(!txs[0].matches_reported());
    }

    #[test]
    fn exports_without_split_columns_are_not_reconciled() {
        let csv = "action,asset,timestamp,lotId,proceeds,costBasisRelieved\n\
                   sell,BTC,2022-01-01,L1,500,0\n";
        let table = read_csv(csv.as_bytes()).unwrap();
        let columns = ActionColumns::resolve(&table).unwrap();
        let txs = extract_transactions(&table, &columns, 2022);
        assert!(!txs[0].has_reported_gain_loss);
        assert!(txs[0].matches_reported());
    }
}

//! Timestamp parsing for the `timestamp` column and date formatting for the
//! form outputs.

use time::{
    format_description::{well_known::Rfc3339, BorrowedFormatItem},
    macros::{datetime, format_description},
    Date, Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset,
};

use crate::Result;

const DATETIME_FMT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const DATETIME_SUBSEC_FMT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");
const DATETIME_MIN_FMT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");
const ISO_DATE_FMT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");
const US_DATETIME_FMT: &[BorrowedFormatItem] = format_description!(
    "[month padding:none]/[day padding:none]/[year] [hour padding:none]:[minute]:[second]"
);
const US_DATETIME_MIN_FMT: &[BorrowedFormatItem] = format_description!(
    "[month padding:none]/[day padding:none]/[year] [hour padding:none]:[minute]"
);
const US_DATE_FMT: &[BorrowedFormatItem] =
    format_description!("[month padding:none]/[day padding:none]/[year]");

/// Output format on Form 8949 and in the tax software CSV.
const FORM_DATE_FMT: &[BorrowedFormatItem] = format_description!("[month]/[day]/[year]");

const DATETIME_FORMATS: [&[BorrowedFormatItem]; 5] = [
    DATETIME_FMT,
    DATETIME_SUBSEC_FMT,
    DATETIME_MIN_FMT,
    US_DATETIME_FMT,
    US_DATETIME_MIN_FMT,
];

const DATE_FORMATS: [&[BorrowedFormatItem]; 2] = [ISO_DATE_FMT, US_DATE_FMT];

/// Zoned layouts RFC 3339 rejects, such as `+0000` offsets.
const OFFSET_FORMATS: [&[BorrowedFormatItem]; 4] = [
    format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
    ),
    format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory][offset_minute]"
    ),
    format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
    ),
    format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]"
    ),
];

fn to_utc(dt: OffsetDateTime) -> PrimitiveDateTime {
    let utc = dt.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}

/// Parses a transaction timestamp into a UTC wall-clock time.
///
/// Zoned RFC 3339 values are converted to UTC. Date-only values land on
/// midnight. Returns `None` when no known layout matches.
pub fn parse_timestamp(value: &str) -> Option<PrimitiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(to_utc(dt));
    }

    if value.len() == 10 && value.bytes().all(|b| b.is_ascii_digit()) {
        let secs: i64 = value.parse().ok()?;
        let dt = OffsetDateTime::from_unix_timestamp(secs).ok()?;
        return Some(PrimitiveDateTime::new(dt.date(), dt.time()));
    }

    let mut normalized = value
        .trim_end_matches(" UTC")
        .trim_end_matches('Z')
        .to_string();
    if normalized.as_bytes().get(10) == Some(&b'T') {
        normalized.replace_range(10..11, " ");
    }

    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| OffsetDateTime::parse(&normalized, fmt).ok())
    {
        return Some(to_utc(dt));
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| PrimitiveDateTime::parse(&normalized, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| Date::parse(&normalized, fmt).ok())
                .map(|d| d.midnight())
        })
}

/// Converts a spreadsheet date serial (days since 1899-12-30) to a
/// timestamp, rounded to the second.
pub fn from_excel_serial(serial: f64) -> Option<PrimitiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let seconds = (serial * 86_400.0).round() as i64;
    datetime!(1899-12-30 0:00).checked_add(Duration::seconds(seconds))
}

/// Canonical `YYYY-MM-DD HH:MM:SS` rendering, parseable by
/// [`parse_timestamp`].
pub fn to_canonical(dt: PrimitiveDateTime) -> Result<String> {
    Ok(dt.format(DATETIME_FMT)?)
}

/// `MM/DD/YYYY`, as printed on the form.
pub fn form_date(date: Date) -> Result<String> {
    Ok(date.format(FORM_DATE_FMT)?)
}

/// Parses a currency cell as exported by Bitwave.
///
/// Accepts surrounding whitespace, `$` signs, thousands separators and the
/// accounting notation `(123.45)` for negatives. Anything that still fails
/// to parse counts as zero so one bad cell never aborts a batch.
pub fn parse_currency(value: &str) -> f64 {
    let value = value.trim();
    if value.is_empty() || value == "-" || value.eq_ignore_ascii_case("nan") {
        return 0.0;
    }

    let negative = value.contains('(') && value.contains(')');
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '$' | ',') && !c.is_whitespace())
        .collect();

    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => {
            if negative {
                -v
            } else {
                v
            }
        }
        _ => 0.0,
    }
}

/// Formats an amount with two decimals and thousands separators, e.g.
/// `-1,234.50`.
pub fn format_amount(value: f64) -> String {
    let rounded = format!("{:.2}", value.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    // -0.001 rounds to 0.00 and must not print as "-0.00"
    let sign = if value < 0.0 && rounded != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

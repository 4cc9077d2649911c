//! Where the blank IRS Form 8949 comes from.

use std::{path::Path, time::Duration};

use anyhow::Context;
use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::Result;

/// Used for tax years with no published form in [`TEMPLATE_YEARS`].
pub const DEFAULT_TEMPLATE_YEAR: i32 = 2024;
pub const TEMPLATE_YEARS: std::ops::RangeInclusive<i32> = 2018..=2025;
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

const CURRENT_FORM_URL: &str = "https://www.irs.gov/pub/irs-pdf/f8949.pdf";

/// Tax year whose form is used for `tax_year`.
pub fn template_year(tax_year: i32) -> i32 {
    if TEMPLATE_YEARS.contains(&tax_year) {
        tax_year
    } else {
        DEFAULT_TEMPLATE_YEAR
    }
}

/// The IRS keeps prior year revisions under `irs-prior`; the newest form
/// lives at a fixed address.
pub fn template_url(tax_year: i32) -> String {
    let year = template_year(tax_year);
    if year == *TEMPLATE_YEARS.end() {
        CURRENT_FORM_URL.to_string()
    } else {
        format!("https://www.irs.gov/pub/irs-prior/f8949--{}.pdf", year)
    }
}

pub fn fetch_template(tax_year: i32, timeout: Duration) -> Result<Vec<u8>> {
    let url = template_url(tax_year);
    info!("Downloading Form 8949 template from {}", url);

    let client = Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to create HTTP client")?;
    let bytes = client
        .get(&url)
        .send()
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.bytes())
        .with_context(|| format!("failed to download {}", url))?;

    debug!("Template is {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

pub fn read_template<P: AsRef<Path>>(file_path: P) -> Result<Vec<u8>> {
    let path = file_path.as_ref();
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read template {}", path.display()))?;
    if !bytes.starts_with(b"%PDF") {
        anyhow::bail!("{} is not a PDF file", path.display());
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_years_use_their_own_revision() {
        assert_eq!(
            template_url(2022),
            "https://www.irs.gov/pub/irs-prior/f8949--2022.pdf"
        );
        assert_eq!(
            template_url(2018),
            "https://www.irs.gov/pub/irs-prior/f8949--2018.pdf"
        );
        assert_eq!(template_url(2025), CURRENT_FORM_URL);
    }

    #[test]
    fn unknown_years_fall_back_to_the_default() {
        assert_eq!(template_year(2012), DEFAULT_TEMPLATE_YEAR);
        assert_eq!(template_year(2031), DEFAULT_TEMPLATE_YEAR);
        assert_eq!(
            template_url(2031),
            format!(
                "https://www.irs.gov/pub/irs-prior/f8949--{}.pdf",
                DEFAULT_TEMPLATE_YEAR
            )
        );
    }

    #[test]
    fn local_template_must_be_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("f8949.pdf");
        let bad = dir.path().join("notes.txt");
        std::fs::write(&good, b"%PDF-1.7\n").unwrap();
        std::fs::write(&bad, b"hello").unwrap();

        assert_eq!(read_template(&good).unwrap(), b"%PDF-1.7\n".to_vec());
        assert!(read_template(&bad).is_err());
        assert!(read_template(dir.path().join("missing.pdf")).is_err());
    }
}

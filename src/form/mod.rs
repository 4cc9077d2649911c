//! Form 8949 PDF generation.
//!
//! Sales are split by holding period, chunked into pages of
//! [`ROWS_PER_PAGE`] rows and rendered one PDF per page. Only the final page
//! of a sequence carries the totals, which cover the whole sequence.

mod blank;
pub mod layout;
mod overlay;

use serde::Deserialize;
use time::Date;
use tracing::{info, warn};

pub use blank::BlankFormRenderer;
pub use overlay::TemplateOverlayRenderer;

use crate::{
    error::ConvertError,
    summary::Totals,
    transactions::{Term, Transaction},
    Result,
};

/// Rows available on one page of the IRS form.
pub const ROWS_PER_PAGE: usize = 14;

/// The checkbox ticked at the top of each part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FormBox {
    /// Basis reported to the IRS on Form 1099-B
    A,
    /// Basis NOT reported to the IRS on Form 1099-B
    #[default]
    B,
    /// Not reported on Form 1099-B
    C,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Taxpayer {
    pub name: String,
    pub ssn: String,
}

impl Taxpayer {
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.ssn.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormHeader {
    pub tax_year: i32,
    pub taxpayer: Taxpayer,
    pub form_box: FormBox,
    pub term: Term,
    pub generated_on: Date,
}

#[derive(Debug, Clone, Copy)]
pub struct FormPage<'a> {
    /// 1-based.
    pub number: usize,
    pub total_pages: usize,
    pub rows: &'a [Transaction],
    pub totals: Option<Totals>,
}

impl FormPage<'_> {
    pub fn is_last(&self) -> bool {
        self.number == self.total_pages
    }
}

pub fn paginate(transactions: &[Transaction]) -> Vec<FormPage<'_>> {
    let total_pages = transactions.len().div_ceil(ROWS_PER_PAGE);
    let totals = Totals::of(transactions);
    transactions
        .chunks(ROWS_PER_PAGE)
        .enumerate()
        .map(|(i, rows)| {
            let number = i + 1;
            FormPage {
                number,
                total_pages,
                rows,
                totals: (number == total_pages).then_some(totals),
            }
        })
        .collect()
}

pub trait PageRenderer {
    fn name(&self) -> &'static str;

    fn render(&self, page: &FormPage<'_>, header: &FormHeader) -> Result<Vec<u8>>;
}

/// Tries the template overlay first and draws the form from scratch if
/// there is no template or the overlay fails.
pub struct FallbackRenderer {
    primary: Option<TemplateOverlayRenderer>,
    fallback: BlankFormRenderer,
}

impl FallbackRenderer {
    pub fn new(primary: Option<TemplateOverlayRenderer>) -> Self {
        Self {
            primary,
            fallback: BlankFormRenderer,
        }
    }
}

impl PageRenderer for FallbackRenderer {
    fn name(&self) -> &'static str {
        match self.primary {
            Some(_) => "template overlay with fallback",
            None => self.fallback.name(),
        }
    }

    fn render(&self, page: &FormPage<'_>, header: &FormHeader) -> Result<Vec<u8>> {
        if let Some(primary) = &self.primary {
            match primary.render(page, header) {
                Ok(pdf) => return Ok(pdf),
                Err(e) => warn!(
                    "Template overlay failed for page {}: {:#}; drawing the form instead",
                    page.number, e
                ),
            }
        }
        self.fallback.render(page, header)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDocument {
    pub filename: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct FormOptions {
    pub tax_year: i32,
    pub taxpayer: Taxpayer,
    pub form_box: FormBox,
    pub generated_on: Date,
}

/// Renders every page of every part, short-term first.
pub fn generate_form_documents(
    transactions: &[Transaction],
    options: &FormOptions,
    renderer: &dyn PageRenderer,
) -> Result<Vec<FormDocument>> {
    if !options.taxpayer.is_complete() {
        return Err(ConvertError::MissingTaxpayer.into());
    }

    let mut documents = Vec::new();
    for term in [Term::Short, Term::Long] {
        let sequence: Vec<Transaction> = transactions
            .iter()
            .filter(|t| t.term == term)
            .cloned()
            .collect();
        if sequence.is_empty() {
            continue;
        }

        let header = FormHeader {
            tax_year: options.tax_year,
            taxpayer: options.taxpayer.clone(),
            form_box: options.form_box,
            term,
            generated_on: options.generated_on,
        };
        let pages = paginate(&sequence);
        info!(
            "Rendering {} {} page(s) with {}",
            pages.len(),
            term,
            renderer.name()
        );
        for page in &pages {
            documents.push(FormDocument {
                filename: page_file_name(&header, page),
                content: renderer.render(page, &header)?,
            });
        }
    }
    Ok(documents)
}

pub fn page_file_name(header: &FormHeader, page: &FormPage<'_>) -> String {
    let name: String = header
        .taxpayer
        .name
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    if page.total_pages == 1 {
        format!("Form_8949_{}_{}_{}.pdf", header.tax_year, header.term, name)
    } else {
        format!(
            "Form_8949_{}_{}_{}_Page_{}.pdf",
            header.tax_year, header.term, name, page.number
        )
    }
}

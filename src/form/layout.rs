//! Text positions on a Form 8949 page, in PDF points from the bottom-left
//! corner of a US Letter page.
//!
//! Two layouts live here: the full page drawn from scratch, and the field
//! positions measured on the IRS reference PDF for the overlay.

use crate::{
    currency::format_amount,
    form::{FormBox, FormHeader, FormPage},
    timestamp::form_date,
    transactions::{Term, Transaction},
    Result,
};

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;

/// Longest description printed in column (a).
pub const DESCRIPTION_MAX_CHARS: usize = 35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    /// `x` is the right edge of the text.
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub weight: Weight,
    pub align: Align,
    pub text: String,
}

impl TextItem {
    /// Left edge of the text once alignment is applied.
    pub fn left(&self) -> f32 {
        match self.align {
            Align::Left => self.x,
            Align::Right => self.x - text_width(&self.text, self.size),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub from: (f32, f32),
    pub to: (f32, f32),
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PageLayout {
    pub texts: Vec<TextItem>,
    pub rules: Vec<Rule>,
}

impl PageLayout {
    fn text(&mut self, x: f32, y: f32, size: f32, text: impl Into<String>) {
        self.push(x, y, size, Weight::Regular, Align::Left, text);
    }

    fn bold(&mut self, x: f32, y: f32, size: f32, text: impl Into<String>) {
        self.push(x, y, size, Weight::Bold, Align::Left, text);
    }

    fn right(&mut self, x: f32, y: f32, size: f32, weight: Weight, text: impl Into<String>) {
        self.push(x, y, size, weight, Align::Right, text);
    }

    fn push(&mut self, x: f32, y: f32, size: f32, weight: Weight, align: Align, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        self.texts.push(TextItem {
            x,
            y,
            size,
            weight,
            align,
            text,
        });
    }

    fn rule(&mut self, from: (f32, f32), to: (f32, f32)) {
        self.rules.push(Rule { from, to });
    }

    /// Every text string in drawing order.
    pub fn lines(&self) -> Vec<&str> {
        self.texts.iter().map(|t| t.text.as_str()).collect()
    }
}

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, // A..P
    778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // Q..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, // a..p
    556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // q..z
    334, 260, 334, 584, // {..~
];

/// Width of `text` set in Helvetica at `size` points.
pub fn text_width(text: &str, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| match c as u32 {
            cp @ 32..=126 => u32::from(HELVETICA_WIDTHS[(cp - 32) as usize]),
            _ => 556,
        })
        .sum();
    units as f32 * size / 1000.0
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn acquired(t: &Transaction) -> Result<String> {
    match t.date_acquired {
        Some(d) => form_date(d),
        None => Ok(crate::export::VARIOUS.to_string()),
    }
}

fn box_label(form_box: FormBox, term: Term) -> String {
    let kind = match term {
        Term::Short => "Short-term",
        Term::Long => "Long-term",
    };
    match form_box {
        FormBox::A => format!(
            "(A) {kind} transactions reported on Form(s) 1099-B showing basis was reported to the IRS"
        ),
        FormBox::B => format!(
            "(B) {kind} transactions reported on Form(s) 1099-B showing basis was NOT reported to the IRS"
        ),
        FormBox::C => format!("(C) {kind} transactions not reported to you on Form 1099-B"),
    }
}

fn part_heading(term: Term) -> &'static str {
    match term {
        Term::Short => {
            "Part I - Short-Term Capital Gains and Losses - Generally for assets held one year or less"
        }
        Term::Long => {
            "Part II - Long-Term Capital Gains and Losses - Generally for assets held more than one year"
        }
    }
}

mod drawn {
    pub const LEFT: f32 = 50.0;
    pub const RIGHT: f32 = 562.0;

    pub const DESCRIPTION: f32 = 50.0;
    pub const ACQUIRED: f32 = 170.0;
    pub const SOLD: f32 = 235.0;
    pub const PROCEEDS_RIGHT: f32 = 375.0;
    pub const BASIS_RIGHT: f32 = 435.0;
    pub const GAIN_RIGHT: f32 = 555.0;

    pub const FIRST_ROW: f32 = 517.0;
    pub const ROW_PITCH: f32 = 18.0;
    pub const TOTALS: f32 = 130.0;
    pub const FOOTER: f32 = 40.0;

    pub const COLUMN_HEADERS: [(&str, &str, f32); 8] = [
        ("(a) Description", "of property", 50.0),
        ("(b) Date", "acquired", 170.0),
        ("(c) Date sold or", "disposed of", 235.0),
        ("(d) Proceeds", "(sales price)", 315.0),
        ("(e) Cost or", "other basis", 380.0),
        ("(f) Code", "", 440.0),
        ("(g) Adjust-", "ment", 470.0),
        ("(h) Gain or", "(loss)", 510.0),
    ];
}

/// The complete form, drawn on an empty page.
pub fn blank_form_layout(page: &FormPage<'_>, header: &FormHeader) -> Result<PageLayout> {
    use drawn::*;

    let mut layout = PageLayout::default();
    let top = PAGE_HEIGHT;

    layout.bold(LEFT, top - 50.0, 14.0, "Form 8949");
    layout.text(150.0, top - 50.0, 10.0, "Sales and Other Dispositions of Capital Assets");
    layout.right(RIGHT, top - 50.0, 10.0, Weight::Bold, header.tax_year.to_string());
    layout.text(
        150.0,
        top - 62.0,
        8.0,
        "Department of the Treasury - Internal Revenue Service",
    );

    layout.text(
        LEFT,
        top - 85.0,
        9.0,
        format!("Name(s) shown on return: {}", header.taxpayer.name),
    );
    layout.text(
        LEFT,
        top - 100.0,
        9.0,
        format!("Your social security number: {}", header.taxpayer.ssn),
    );

    layout.bold(LEFT, top - 135.0, 10.0, part_heading(header.term));
    for (i, form_box) in [FormBox::A, FormBox::B, FormBox::C].into_iter().enumerate() {
        let mark = if form_box == header.form_box { "[X]" } else { "[ ]" };
        layout.text(
            LEFT,
            top - 160.0 - i as f32 * 15.0,
            9.0,
            format!("{} {}", mark, box_label(form_box, header.term)),
        );
    }

    for (title, subtitle, x) in COLUMN_HEADERS {
        layout.bold(x, top - 220.0, 7.0, title);
        layout.text(x, top - 229.0, 7.0, subtitle);
    }
    layout.rule((LEFT, top - 240.0), (RIGHT, top - 240.0));

    for (i, t) in page.rows.iter().enumerate() {
        let y = FIRST_ROW - i as f32 * ROW_PITCH;
        layout.text(DESCRIPTION, y, 8.0, truncate(&t.description, DESCRIPTION_MAX_CHARS));
        layout.text(ACQUIRED, y, 8.0, acquired(t)?);
        layout.text(SOLD, y, 8.0, form_date(t.date_sold)?);
        layout.right(PROCEEDS_RIGHT, y, 8.0, Weight::Regular, format_amount(t.proceeds));
        layout.right(BASIS_RIGHT, y, 8.0, Weight::Regular, format_amount(t.cost_basis));
        layout.right(GAIN_RIGHT, y, 8.0, Weight::Regular, format_amount(t.gain_loss));
    }

    if let Some(totals) = page.totals {
        layout.bold(LEFT, TOTALS, 9.0, "Totals for all transactions:");
        layout.right(PROCEEDS_RIGHT, TOTALS, 9.0, Weight::Bold, format_amount(totals.proceeds));
        layout.right(BASIS_RIGHT, TOTALS, 9.0, Weight::Bold, format_amount(totals.cost_basis));
        layout.right(GAIN_RIGHT, TOTALS, 9.0, Weight::Bold, format_amount(totals.gain_loss));
        layout.rule((315.0, TOTALS + 10.0), (GAIN_RIGHT, TOTALS + 10.0));
    }

    let footer = if page.total_pages > 1 {
        format!(
            "Form 8949 ({}) - Page {} of {}",
            header.tax_year, page.number, page.total_pages
        )
    } else {
        format!("Form 8949 ({})", header.tax_year)
    };
    layout.text(LEFT, FOOTER, 8.0, footer);
    layout.right(
        RIGHT,
        FOOTER,
        8.0,
        Weight::Regular,
        format!("Generated from Bitwave: {}", form_date(header.generated_on)?),
    );

    Ok(layout)
}

/// Field positions on the IRS PDF. Part I sits on page 1 and Part II on
/// page 2; the two pages differ only vertically.
struct TemplateFields {
    name: (f32, f32),
    ssn: (f32, f32),
    checkbox_x: f32,
    checkbox_y: [f32; 3],
    first_row: f32,
    totals: f32,
}

const PART_I_FIELDS: TemplateFields = TemplateFields {
    name: (38.0, 697.0),
    ssn: (454.0, 697.0),
    checkbox_x: 48.5,
    checkbox_y: [561.0, 547.0, 533.0],
    first_row: 459.0,
    totals: 126.0,
};

const PART_II_FIELDS: TemplateFields = TemplateFields {
    name: (38.0, 709.0),
    ssn: (454.0, 709.0),
    checkbox_x: 48.5,
    checkbox_y: [573.0, 559.0, 545.0],
    first_row: 471.0,
    totals: 138.0,
};

mod measured {
    pub const ROW_PITCH: f32 = 24.0;
    pub const DESCRIPTION: f32 = 38.0;
    pub const ACQUIRED: f32 = 170.0;
    pub const SOLD: f32 = 226.0;
    pub const PROCEEDS_RIGHT: f32 = 341.0;
    pub const BASIS_RIGHT: f32 = 413.0;
    pub const ADJUSTMENT_RIGHT: f32 = 505.0;
    pub const GAIN_RIGHT: f32 = 575.0;
}

/// Only the filled-in values, positioned for the IRS reference PDF.
pub fn template_overlay_layout(page: &FormPage<'_>, header: &FormHeader) -> Result<PageLayout> {
    use measured::*;

    let fields = match header.term {
        Term::Short => &PART_I_FIELDS,
        Term::Long => &PART_II_FIELDS,
    };
    let mut layout = PageLayout::default();

    layout.text(fields.name.0, fields.name.1, 10.0, header.taxpayer.name.as_str());
    layout.text(fields.ssn.0, fields.ssn.1, 10.0, header.taxpayer.ssn.as_str());

    let checked = match header.form_box {
        FormBox::A => 0,
        FormBox::B => 1,
        FormBox::C => 2,
    };
    layout.bold(fields.checkbox_x, fields.checkbox_y[checked], 9.0, "X");

    for (i, t) in page.rows.iter().enumerate() {
        let y = fields.first_row - i as f32 * ROW_PITCH;
        layout.text(DESCRIPTION, y, 8.0, truncate(&t.description, DESCRIPTION_MAX_CHARS));
        layout.text(ACQUIRED, y, 8.0, acquired(t)?);
        layout.text(SOLD, y, 8.0, form_date(t.date_sold)?);
        layout.right(PROCEEDS_RIGHT, y, 8.0, Weight::Regular, format_amount(t.proceeds));
        layout.right(BASIS_RIGHT, y, 8.0, Weight::Regular, format_amount(t.cost_basis));
        layout.right(GAIN_RIGHT, y, 8.0, Weight::Regular, format_amount(t.gain_loss));
    }

    if let Some(totals) = page.totals {
        let y = fields.totals;
        layout.right(PROCEEDS_RIGHT, y, 8.0, Weight::Bold, format_amount(totals.proceeds));
        layout.right(BASIS_RIGHT, y, 8.0, Weight::Bold, format_amount(totals.cost_basis));
        layout.right(ADJUSTMENT_RIGHT, y, 8.0, Weight::Bold, "0.00");
        layout.right(GAIN_RIGHT, y, 8.0, Weight::Bold, format_amount(totals.gain_loss));
    }

    Ok(layout)
}

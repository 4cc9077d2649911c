use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Pt};

use super::{
    layout::{blank_form_layout, PageLayout, Weight, PAGE_HEIGHT, PAGE_WIDTH},
    FormHeader, FormPage, PageRenderer,
};
use crate::Result;

/// Draws the whole form on an empty US Letter page.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlankFormRenderer;

fn pt(value: f32) -> Mm {
    Mm::from(Pt(value))
}

impl PageRenderer for BlankFormRenderer {
    fn name(&self) -> &'static str {
        "blank form"
    }

    fn render(&self, page: &FormPage<'_>, header: &FormHeader) -> Result<Vec<u8>> {
        let layout = blank_form_layout(page, header)?;
        let title = format!("Form 8949 ({}) - {}", header.tax_year, header.term);
        let (doc, page_idx, layer_idx) =
            PdfDocument::new(title.as_str(), pt(PAGE_WIDTH), pt(PAGE_HEIGHT), "Form 8949");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let layer = doc.get_page(page_idx).get_layer(layer_idx);

        draw(&layer, &layout, &regular, &bold);

        Ok(doc.save_to_bytes()?)
    }
}

fn draw(
    layer: &PdfLayerReference,
    layout: &PageLayout,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    for item in &layout.texts {
        let font = match item.weight {
            Weight::Regular => regular,
            Weight::Bold => bold,
        };
        layer.use_text(item.text.as_str(), item.size, pt(item.left()), pt(item.y), font);
    }

    for rule in &layout.rules {
        layer.add_line(Line {
            points: vec![
                (Point::new(pt(rule.from.0), pt(rule.from.1)), false),
                (Point::new(pt(rule.to.0), pt(rule.to.1)), false),
            ],
            is_closed: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{paginate, FormBox, Taxpayer};
    use crate::transactions::{Term, Transaction};
    use time::macros::date;

    #[test]
    fn renders_a_single_page_pdf() {
        let txs = vec![Transaction {
            asset: "BTC".to_string(),
            description: "BTC cryptocurrency".to_string(),
            date_acquired: Some(date!(2022-01-01)),
            date_sold: date!(2022-02-01),
            proceeds: 10.0,
            cost_basis: 4.0,
            gain_loss: 6.0,
            short_term_gain_loss: 6.0,
            long_term_gain_loss: 0.0,
            has_reported_gain_loss: false,
            term: Term::Short,
            lot_id: None,
        }];
        let header = FormHeader {
            tax_year: 2022,
            taxpayer: Taxpayer {
                name: "A B".to_string(),
                ssn: "000-00-0000".to_string(),
            },
            form_box: FormBox::B,
            term: Term::Short,
            generated_on: date!(2023-01-01),
        };
        let pdf = BlankFormRenderer.render(&paginate(&txs)[0], &header).unwrap();
        assert!(pdf.starts_with(b"%PDF"));

        let doc = lopdf::Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }
}

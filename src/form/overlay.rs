use anyhow::{bail, Context};
use lopdf::{
    content::{Content, Operation},
    dictionary, Dictionary, Document, Object, ObjectId, Stream,
};
use tracing::debug;

use super::{
    layout::{template_overlay_layout, PageLayout, Weight},
    FormHeader, FormPage, PageRenderer,
};
use crate::{transactions::Term, Result};

const REGULAR_FONT: &str = "F8949R";
const BOLD_FONT: &str = "F8949B";

/// Writes the form values on top of the IRS reference PDF.
///
/// The template keeps only the page of the part being filled: page 1 for
/// Part I (short-term), page 2 for Part II (long-term). Single-page
/// templates are used as is.
#[derive(Debug, Clone)]
pub struct TemplateOverlayRenderer {
    template: Vec<u8>,
}

impl TemplateOverlayRenderer {
    pub fn new(template: Vec<u8>) -> Self {
        Self { template }
    }
}

impl PageRenderer for TemplateOverlayRenderer {
    fn name(&self) -> &'static str {
        "template overlay"
    }

    fn render(&self, page: &FormPage<'_>, header: &FormHeader) -> Result<Vec<u8>> {
        let layout = template_overlay_layout(page, header)?;
        let mut doc =
            Document::load_mem(&self.template).context("failed to parse the template PDF")?;

        let page_id = keep_part_page(&mut doc, header.term)?;
        install_fonts(&mut doc, page_id)?;
        let content = overlay_content(&layout)?;
        append_content(&mut doc, page_id, content)?;

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .context("failed to write the filled template")?;
        Ok(out)
    }
}

fn keep_part_page(doc: &mut Document, term: Term) -> Result<ObjectId> {
    let pages = doc.get_pages();
    if pages.is_empty() {
        bail!("the template PDF has no pages");
    }
    let wanted = match term {
        Term::Short => 1,
        Term::Long => 2,
    };
    let keep = if pages.contains_key(&wanted) { wanted } else { 1 };
    debug!("Using template page {} of {}", keep, pages.len());

    let others: Vec<u32> = pages.keys().copied().filter(|n| *n != keep).collect();
    if !others.is_empty() {
        doc.delete_pages(&others);
    }
    doc.get_pages()
        .values()
        .next()
        .copied()
        .context("template page disappeared")
}

enum FontSlot {
    Indirect(ObjectId),
    Inline,
    Missing,
}

fn install_fonts(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });

    inline_inherited_resources(doc, page_id)?;

    let slot = {
        let resources = doc.get_or_create_resources(page_id)?.as_dict_mut()?;
        match resources.get(b"Font") {
            Ok(Object::Reference(id)) => FontSlot::Indirect(*id),
            Ok(Object::Dictionary(_)) => FontSlot::Inline,
            _ => FontSlot::Missing,
        }
    };
    let fonts = match slot {
        FontSlot::Indirect(id) => doc.get_object_mut(id)?.as_dict_mut()?,
        FontSlot::Inline => doc
            .get_or_create_resources(page_id)?
            .as_dict_mut()?
            .get_mut(b"Font")?
            .as_dict_mut()?,
        FontSlot::Missing => {
            let resources = doc.get_or_create_resources(page_id)?.as_dict_mut()?;
            resources.set("Font", Dictionary::new());
            resources.get_mut(b"Font")?.as_dict_mut()?
        }
    };
    fonts.set(REGULAR_FONT, regular);
    fonts.set(BOLD_FONT, bold);
    Ok(())
}

/// Pages may inherit `Resources` from their page tree parents. Copy the
/// nearest inherited dictionary onto the page so fonts can be added without
/// hiding what the page already uses.
fn inline_inherited_resources(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    if doc.get_object(page_id)?.as_dict()?.has(b"Resources") {
        return Ok(());
    }

    let mut inherited: Option<Dictionary> = None;
    let mut node = doc
        .get_object(page_id)?
        .as_dict()?
        .get(b"Parent")
        .and_then(Object::as_reference)
        .ok();
    while let Some(id) = node {
        let dict = doc.get_object(id)?.as_dict()?;
        match dict.get(b"Resources") {
            Ok(Object::Dictionary(d)) => inherited = Some(d.clone()),
            Ok(Object::Reference(r)) => inherited = Some(doc.get_object(*r)?.as_dict()?.clone()),
            _ => {}
        }
        if inherited.is_some() {
            break;
        }
        node = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }

    if let Some(resources) = inherited {
        doc.get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Resources", resources);
    }
    Ok(())
}

/// Maps text to single-byte WinAnsi codes; anything outside Latin-1
/// becomes `?`.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn real(v: f32) -> Object {
    Object::Real(v.into())
}

fn overlay_content(layout: &PageLayout) -> Result<Vec<u8>> {
    let mut operations = vec![Operation::new("g", vec![real(0.0)])];

    for item in &layout.texts {
        let font = match item.weight {
            Weight::Regular => REGULAR_FONT,
            Weight::Bold => BOLD_FONT,
        };
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), real(item.size)]),
            Operation::new("Td", vec![real(item.left()), real(item.y)]),
            Operation::new("Tj", vec![Object::string_literal(encode_text(&item.text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    if !layout.rules.is_empty() {
        operations.push(Operation::new("w", vec![real(0.5)]));
        for rule in &layout.rules {
            operations.extend([
                Operation::new("m", vec![real(rule.from.0), real(rule.from.1)]),
                Operation::new("l", vec![real(rule.to.0), real(rule.to.1)]),
                Operation::new("S", vec![]),
            ]);
        }
    }

    Ok(Content { operations }.encode()?)
}

/// Wraps the existing page content in `q`/`Q` so its graphics state cannot
/// leak into the overlay, then appends the overlay stream.
fn append_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let save = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore = doc.add_object(Stream::new(Dictionary::new(), b"Q\n".to_vec()));
    let overlay = doc.add_object(Stream::new(Dictionary::new(), content));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    let existing = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let mut contents = Vec::with_capacity(existing.len() + 3);
    contents.push(Object::Reference(save));
    contents.extend(existing);
    contents.push(Object::Reference(restore));
    contents.push(Object::Reference(overlay));
    page.set("Contents", Object::Array(contents));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{paginate, BlankFormRenderer, FormBox, Taxpayer};
    use crate::transactions::Transaction;
    use printpdf::{Mm, PdfDocument};
    use time::macros::date;

    fn header(term: Term) -> FormHeader {
        FormHeader {
            tax_year: 2022,
            taxpayer: Taxpayer {
                name: "Jenny L".to_string(),
                ssn: "123-45-6789".to_string(),
            },
            form_box: FormBox::A,
            term,
            generated_on: date!(2023-03-01),
        }
    }

    fn sales(term: Term) -> Vec<Transaction> {
        vec![Transaction {
            asset: "BTC".to_string(),
            description: "BTC cryptocurrency".to_string(),
            date_acquired: Some(date!(2020-01-01)),
            date_sold: date!(2022-04-01),
            proceeds: 2500.0,
            cost_basis: 1000.0,
            gain_loss: 1500.0,
            short_term_gain_loss: 0.0,
            long_term_gain_loss: 1500.0,
            has_reported_gain_loss: true,
            term,
            lot_id: Some("L1".to_string()),
        }]
    }

    fn two_page_template() -> Vec<u8> {
        let (doc, _, _) = PdfDocument::new("template", Mm(215.9), Mm(279.4), "page 1");
        doc.add_page(Mm(215.9), Mm(279.4), "page 2");
        doc.save_to_bytes().unwrap()
    }

    fn page_text(pdf: &[u8]) -> (usize, Vec<u8>) {
        let doc = Document::load_mem(pdf).unwrap();
        let pages = doc.get_pages();
        let page_id = *pages.values().next().unwrap();
        (pages.len(), doc.get_page_content(page_id).unwrap())
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn overlays_values_on_a_single_page_template() {
        let txs = sales(Term::Short);
        let pages = paginate(&txs);
        let template = BlankFormRenderer.render(&pages[0], &header(Term::Short)).unwrap();

        let pdf = TemplateOverlayRenderer::new(template)
            .render(&pages[0], &header(Term::Short))
            .unwrap();
        let (count, content) = page_text(&pdf);
        assert_eq!(count, 1);
        assert!(contains(&content, b"(Jenny L)"));
        assert!(contains(&content, b"(2,500.00)"));
        assert!(contains(&content, b"/F8949B"));
    }

    #[test]
    fn long_term_keeps_the_second_page() {
        let txs = sales(Term::Long);
        let pages = paginate(&txs);
        let pdf = TemplateOverlayRenderer::new(two_page_template())
            .render(&pages[0], &header(Term::Long))
            .unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn garbage_template_is_an_error() {
        let txs = sales(Term::Short);
        let pages = paginate(&txs);
        assert!(TemplateOverlayRenderer::new(b"%PDF-1.7 nope".to_vec())
            .render(&pages[0], &header(Term::Short))
            .is_err());
    }

    #[test]
    fn text_is_single_byte_encoded() {
        assert_eq!(encode_text("José"), b"Jos\xe9".to_vec());
        assert_eq!(encode_text("€5"), b"?5".to_vec());
    }
}

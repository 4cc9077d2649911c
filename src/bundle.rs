//! Packaging of generated PDFs: a single page is delivered as is, anything
//! more goes into one ZIP archive.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;
use zip::{write::FileOptions, ZipWriter};

use crate::{form::FormDocument, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub filename: String,
    pub content: Vec<u8>,
}

impl From<FormDocument> for OutputFile {
    fn from(doc: FormDocument) -> Self {
        Self {
            filename: doc.filename,
            content: doc.content,
        }
    }
}

impl OutputFile {
    pub fn write_to<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.filename);
        std::fs::write(&path, &self.content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Wrote {} ({} bytes)", path.display(), self.content.len());
        Ok(path)
    }
}

pub fn zip_file_name(tax_year: i32) -> String {
    format!("form_8949_{}_complete.zip", tax_year)
}

/// Returns `None` when there is nothing to deliver.
pub fn bundle(documents: Vec<FormDocument>, tax_year: i32) -> Result<Option<OutputFile>> {
    if documents.len() <= 1 {
        return Ok(documents.into_iter().next().map(OutputFile::from));
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::<()>::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for doc in &documents {
        zip.start_file(doc.filename.as_str(), options)
            .with_context(|| format!("failed to start ZIP entry {}", doc.filename))?;
        zip.write_all(&doc.content)
            .context("failed to write data to ZIP")?;
    }
    let content = zip
        .finish()
        .context("failed to finish ZIP archive")?
        .into_inner();

    info!("Bundled {} PDF files", documents.len());
    Ok(Some(OutputFile {
        filename: zip_file_name(tax_year),
        content,
    }))
}

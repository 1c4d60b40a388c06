
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use pulldown_cmark::{Event, Parser, TagEnd};
use tracing::{debug, warn};

/// Extract plain text from a source document.
///
/// The supported format set is deliberately closed: plain text (`.txt`) and
/// Markdown (`.md`/`.markdown`, rendered down to plain text). Files with any
/// other extension extract to an empty string, which the ingestor reports as
/// `no_text_extracted` rather than raising here.
#[inline]
pub fn extract_text(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "txt" => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read text file: {}", path.display()))?;
            debug!("Extracted {} bytes from {}", text.len(), path.display());
            Ok(text)
        }
        "md" | "markdown" => {
            let markdown = fs::read_to_string(path)
                .with_context(|| format!("Failed to read markdown file: {}", path.display()))?;
            let text = markdown_to_text(&markdown);
            debug!(
                "Extracted {} bytes of text from markdown {}",
                text.len(),
                path.display()
            );
            Ok(text)
        }
        other => {
            warn!(
                "Unsupported document format '{}' for {}, extracting no text",
                other,
                path.display()
            );
            Ok(String::new())
        }
    }
}

/// Render Markdown to plain text, keeping prose and code content and
/// dropping all markup.
fn markdown_to_text(markdown: &str) -> String {
    let mut text = String::with_capacity(markdown.len());

    for event in Parser::new(markdown) {
        match event {
            Event::Text(content) | Event::Code(content) => text.push_str(&content),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item)
            | Event::End(TagEnd::CodeBlock) => text.push('\n'),
            _ => {}
        }
    }

    text
}

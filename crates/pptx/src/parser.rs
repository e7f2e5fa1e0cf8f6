//! PPTX deck parser: shape-level text extraction in document order.

use croco_core::{clean::is_valid_shape_text, Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Read, Seek};
use zip::ZipArchive;

/// Parser for PPTX (Office Open XML) decks.
pub struct DeckParser;

impl DeckParser {
    /// Create a new deck parser.
    pub fn new() -> Self {
        Self
    }

    /// Extract candidate words from a deck.
    ///
    /// Slides are visited in presentation order, shapes in document order
    /// within a slide. Only shapes carrying a text body participate; their
    /// raw text is tested against the single-word validity predicate and,
    /// if accepted, trimmed and appended. A deck with zero qualifying
    /// shapes yields an empty vec.
    pub fn extract_words<R: Read + Seek>(&self, reader: R) -> Result<Vec<String>> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::InvalidInput(format!("failed to open deck: {}", e)))?;

        let slide_order = self.slide_order(&mut archive)?;

        let mut words = Vec::new();
        for slide_path in &slide_order {
            let content = self.read_file_from_archive(&mut archive, slide_path)?;
            for text in extract_shape_texts(&content) {
                if is_valid_shape_text(&text) {
                    words.push(text.trim().to_string());
                }
            }
        }

        log::info!("extracted {} candidate words from deck", words.len());
        Ok(words)
    }

    /// Ordered list of slide paths from the presentation relationships.
    fn slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let rels_path = "ppt/_rels/presentation.xml.rels";
        let rels_content = self.read_file_from_archive(archive, rels_path)?;

        let mut slides: Vec<(String, Option<usize>)> = Vec::new();
        let mut reader = Reader::from_str(&rels_content);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let mut rel_type = String::new();
                    let mut target = String::new();
                    let mut id = String::new();

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Type" => {
                                rel_type = String::from_utf8_lossy(&attr.value).to_string();
                            }
                            b"Target" => {
                                target = String::from_utf8_lossy(&attr.value).to_string();
                            }
                            b"Id" => {
                                id = String::from_utf8_lossy(&attr.value).to_string();
                            }
                            _ => {}
                        }
                    }

                    if rel_type.contains("/slide")
                        && !rel_type.contains("slideLayout")
                        && !rel_type.contains("slideMaster")
                    {
                        let order_num =
                            extract_slide_number(&id).or_else(|| extract_slide_number(&target));
                        let full_path = if let Some(stripped) = target.strip_prefix('/') {
                            stripped.to_string()
                        } else {
                            format!("ppt/{}", target)
                        };
                        slides.push((full_path, order_num));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::InvalidInput(format!(
                        "error parsing deck relationships: {}",
                        e
                    )));
                }
                _ => {}
            }
        }

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Read a file from the deck's ZIP container.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::InvalidInput(format!("missing deck entry '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::InvalidInput(format!("failed to read '{}': {}", path, e)))?;

        Ok(content)
    }
}

impl Default for DeckParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw text of every shape in a slide that carries a text body, in
/// document order. Paragraphs inside one shape are joined with newlines.
fn extract_shape_texts(xml_content: &str) -> Vec<String> {
    let mut shapes = Vec::new();
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(true);

    let mut in_shape = false;
    let mut has_text_body = false;
    let mut in_text_body = false;
    let mut in_paragraph = false;
    let mut current_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"sp" => {
                        in_shape = true;
                        has_text_body = false;
                        current_text.clear();
                    }
                    b"txBody" if in_shape => {
                        has_text_body = true;
                        in_text_body = true;
                    }
                    b"p" if in_text_body => {
                        in_paragraph = true;
                        if !current_text.is_empty() {
                            current_text.push('\n');
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                if in_paragraph {
                    let text = e.unescape().unwrap_or_default();
                    current_text.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"sp" => {
                        if in_shape && has_text_body {
                            shapes.push(current_text.clone());
                        }
                        in_shape = false;
                        has_text_body = false;
                        in_text_body = false;
                        in_paragraph = false;
                        current_text.clear();
                    }
                    b"txBody" => {
                        in_text_body = false;
                    }
                    b"p" => {
                        in_paragraph = false;
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("XML parsing error (continuing): {}", e);
            }
            _ => {}
        }
    }

    shapes
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

//! The PPTX container: a ZIP archive of XML parts.
//!
//! Every part is held in memory in archive order. Slide parts are also parsed
//! so their text can be lowered into the deck model and written back; all
//! other parts are copied through unchanged on save.

use crate::slide::{read_slide, write_slide};
use crate::xml::{self, XmlDocument, XmlElement};
use deckfill_core::{Document, Error, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";
const SLIDE_REL_TYPE: &str = "/relationships/slide";

/// One archive entry, kept byte for byte.
#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    modified: DateTime,
    is_dir: bool,
}

/// A parsed slide part.
#[derive(Debug, Clone)]
struct SlidePart {
    path: String,
    xml: XmlDocument,
}

/// An opened PowerPoint package.
#[derive(Debug, Clone)]
pub struct PptxPackage {
    entries: Vec<PackageEntry>,
    slides: Vec<SlidePart>,
}

impl PptxPackage {
    /// Open a package from a reader.
    pub fn open<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive
                .by_index(index)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", index, e)))?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", file.name(), e)))?;
            entries.push(PackageEntry {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                modified: file.last_modified(),
                is_dir: file.is_dir(),
            });
        }

        let mut package = Self {
            entries,
            slides: Vec::new(),
        };
        if package.entry(PRESENTATION_PART).is_none() {
            return Err(Error::PptxParseError(format!(
                "Not a presentation: '{}' is missing",
                PRESENTATION_PART
            )));
        }

        for path in package.get_slide_order()? {
            let content = package.read_part(&path)?;
            let xml = xml::parse(&content)
                .map_err(|e| Error::PptxParseError(format!("Invalid slide '{}': {}", path, e)))?;
            package.slides.push(SlidePart { path, xml });
        }
        log::debug!(
            "Opened package with {} parts and {} slides",
            package.entries.len(),
            package.slides.len()
        );

        Ok(package)
    }

    /// Open a package held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::open(Cursor::new(bytes))
    }

    /// Slide part paths in presentation order.
    pub fn slide_paths(&self) -> Vec<&str> {
        self.slides.iter().map(|s| s.path.as_str()).collect()
    }

    /// Lower every slide into the deck model.
    pub fn document(&self) -> Document {
        let mut document = Document::new();
        for (idx, part) in self.slides.iter().enumerate() {
            document.add_slide(read_slide(&part.xml.root, idx + 1));
        }
        document
    }

    /// Write a (modified) deck model back into the slide parts. The model must
    /// come from [`PptxPackage::document`] on this package.
    pub fn store(&mut self, document: &Document) -> Result<()> {
        if document.slides.len() != self.slides.len() {
            return Err(Error::PptxParseError(format!(
                "Document has {} slides, package has {}",
                document.slides.len(),
                self.slides.len()
            )));
        }
        for (part, slide) in self.slides.iter_mut().zip(&document.slides) {
            write_slide(&mut part.xml.root, slide);
        }
        Ok(())
    }

    /// Serialize the package to a writer. Parts keep their order, timestamps
    /// and compression; slide parts are re-serialized from their XML.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let slide_index: HashMap<&str, &XmlDocument> = self
            .slides
            .iter()
            .map(|part| (part.path.as_str(), &part.xml))
            .collect();

        let mut zip = ZipWriter::new(writer);
        for entry in &self.entries {
            let method = match entry.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = FileOptions::default()
                .compression_method(method)
                .last_modified_time(entry.modified);

            if entry.is_dir {
                zip.add_directory(entry.name.as_str(), options)
                    .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", entry.name, e)))?;
                continue;
            }

            zip.start_file(entry.name.as_str(), options)
                .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", entry.name, e)))?;
            match slide_index.get(entry.name.as_str()) {
                Some(doc) => zip.write_all(&xml::write(doc)?)?,
                None => zip.write_all(&entry.data)?,
            }
        }
        zip.finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish ZIP: {}", e)))?;
        Ok(())
    }

    /// Serialize the package into memory.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    fn entry(&self, path: &str) -> Option<&PackageEntry> {
        self.entries.iter().find(|e| e.name == path)
    }

    /// Read a part as text.
    fn read_part(&self, path: &str) -> Result<String> {
        let entry = self
            .entry(path)
            .ok_or_else(|| Error::ZipError(format!("File not found in archive '{}'", path)))?;
        let content = String::from_utf8(entry.data.clone())
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;
        Ok(match content.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => content,
        })
    }

    /// Get the ordered list of slide paths.
    ///
    /// The slide id list in `presentation.xml` is authoritative. When it is
    /// absent, slide relationships are sorted by the number in their target.
    fn get_slide_order(&self) -> Result<Vec<String>> {
        let rels_content = self.read_part(PRESENTATION_RELS)?;
        let rels = xml::parse(&rels_content)
            .map_err(|e| Error::XmlError(format!("Error parsing relationships: {}", e)))?;

        let mut targets: HashMap<String, String> = HashMap::new();
        let mut slides: Vec<(String, Option<usize>)> = Vec::new();
        for rel in rels.root.elements().filter(|el| el.local_name() == "Relationship") {
            let rel_type = rel.attr("Type").unwrap_or_default();
            if !rel_type.ends_with(SLIDE_REL_TYPE) {
                continue;
            }
            let (Some(id), Some(target)) = (rel.attr("Id"), rel.attr("Target")) else {
                continue;
            };
            let full_path = resolve_target(target);
            let order_num = extract_slide_number(target).or_else(|| extract_slide_number(id));
            targets.insert(id.to_string(), full_path.clone());
            slides.push((full_path, order_num));
        }

        let presentation = xml::parse(&self.read_part(PRESENTATION_PART)?)
            .map_err(|e| Error::PptxParseError(format!("Invalid presentation part: {}", e)))?;
        if let Some(list) = presentation.root.child("sldIdLst") {
            let mut ordered = Vec::new();
            for sld_id in list.elements() {
                let Some(rel_id) = relationship_id(sld_id) else {
                    continue;
                };
                match targets.get(rel_id) {
                    Some(path) => ordered.push(path.clone()),
                    None => log::warn!("Slide id refers to unknown relationship {}", rel_id),
                }
            }
            return Ok(ordered);
        }

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });
        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }
}

/// The `r:id` of a `p:sldId`, whatever the relationships prefix is.
fn relationship_id(sld_id: &XmlElement) -> Option<&str> {
    sld_id
        .attributes
        .iter()
        .find(|(key, _)| key.contains(':') && xml::local_name(key) == "id")
        .map(|(_, value)| value.as_str())
}

/// Resolve a relationship target from `presentation.xml` to a part path.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{}", target),
    }
}

/// Extract a slide number from a string like "rId2" or "slides/slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckfill_core::{apply_replacements, FillOptions, ReplacementTable, Shape};

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;

    fn slide_part(text: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:sp><p:nvSpPr><p:cNvPr id="2" name="TextBox 1"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US" sz="2400"/><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
            text
        )
    }

    /// Build a minimal package. Slides are listed in `order` (1-based part
    /// numbers) in the slide id list.
    fn build_package(slides: &[&str], order: &[usize]) -> Vec<u8> {
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>"#,
        );
        for n in 1..=slides.len() {
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{}.xml"/>"#,
                n + 1,
                n
            ));
        }
        rels.push_str("</Relationships>");

        let ids: String = order
            .iter()
            .enumerate()
            .map(|(i, n)| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, n + 1))
            .collect();
        let presentation = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:sldIdLst>{}</p:sldIdLst></p:presentation>"#,
            ids
        );

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file("[Content_Types].xml", stored).unwrap();
        zip.write_all(CONTENT_TYPES.as_bytes()).unwrap();
        zip.start_file(PRESENTATION_PART, deflated).unwrap();
        zip.write_all(presentation.as_bytes()).unwrap();
        zip.start_file(PRESENTATION_RELS, deflated).unwrap();
        zip.write_all(rels.as_bytes()).unwrap();
        for (i, text) in slides.iter().enumerate() {
            zip.start_file(format!("ppt/slides/slide{}.xml", i + 1), deflated)
                .unwrap();
            zip.write_all(slide_part(text).as_bytes()).unwrap();
        }
        zip.start_file("ppt/media/image1.png", stored).unwrap();
        zip.write_all(&[0x89, b'P', b'N', b'G', 0, 1, 2, 3]).unwrap();
        zip.finish().unwrap().into_inner()
    }

    fn read_entry(bytes: &[u8], name: &str) -> Vec<u8> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        data
    }

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("rId1"), Some(1));
        assert_eq!(extract_slide_number("rId12"), Some(12));
        assert_eq!(extract_slide_number("slide1.xml"), Some(1));
        assert_eq!(extract_slide_number("slides/slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("nodigits"), None);
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(resolve_target("/ppt/slides/slide2.xml"), "ppt/slides/slide2.xml");
    }

    #[test]
    fn test_slide_order_follows_slide_id_list() {
        let bytes = build_package(&["one", "two", "three"], &[3, 1, 2]);
        let package = PptxPackage::from_bytes(&bytes).unwrap();

        assert_eq!(
            package.slide_paths(),
            vec![
                "ppt/slides/slide3.xml",
                "ppt/slides/slide1.xml",
                "ppt/slides/slide2.xml"
            ]
        );
        let document = package.document();
        assert_eq!(document.slides[0].number, 1);
        assert_eq!(document.text_frames()[0].text(), "three");
    }

    #[test]
    fn test_not_a_zip() {
        let err = PptxPackage::from_bytes(b"plain text").unwrap_err();
        assert!(matches!(err, Error::ZipError(_)));
    }

    #[test]
    fn test_untouched_parts_are_copied() {
        let bytes = build_package(&["Hello [Name]"], &[1]);
        let mut package = PptxPackage::from_bytes(&bytes).unwrap();
        let mut document = package.document();
        let mut table = ReplacementTable::new();
        table.insert_value("[Name]", "Ava");

        apply_replacements(&mut document, &table, &FillOptions::new());
        package.store(&document).unwrap();
        let out = package.to_bytes().unwrap();

        for name in ["[Content_Types].xml", PRESENTATION_PART, "ppt/media/image1.png"] {
            assert_eq!(read_entry(&out, name), read_entry(&bytes, name), "{}", name);
        }

        let mut archive = ZipArchive::new(Cursor::new(out.as_slice())).unwrap();
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        assert_eq!(names.len(), 5);
        assert_eq!(
            archive.by_name("ppt/media/image1.png").unwrap().compression(),
            CompressionMethod::Stored
        );
    }

    #[test]
    fn test_fill_round_trip() {
        let bytes = build_package(&["Hello [Name], welcome", "Team: [team]"], &[1, 2]);
        let mut package = PptxPackage::from_bytes(&bytes).unwrap();
        let mut document = package.document();
        let mut table = ReplacementTable::new();
        table.insert_value("[Name]", "Ava");
        table.insert_missing("[team]");

        apply_replacements(&mut document, &table, &FillOptions::new());
        package.store(&document).unwrap();
        let reopened = PptxPackage::from_bytes(&package.to_bytes().unwrap()).unwrap();
        let filled = reopened.document();

        let texts: Vec<String> = filled.text_frames().iter().map(|f| f.text()).collect();
        assert_eq!(texts, vec!["Hello Ava, welcome", "Team: No team field in excel"]);

        let Shape::Text { frame, .. } = &filled.slides[0].shapes[0] else {
            panic!("expected text box");
        };
        let runs = &frame.paragraphs[0].runs;
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[1].text, "Ava");
        assert_eq!(runs[1].format.color, Some(FillOptions::new().palette.name_color));
        assert_eq!(runs[1].format.size, runs[0].format.size);
        assert_eq!(frame.word_wrap, Some(true));

        let raw = String::from_utf8(read_entry(&package.to_bytes().unwrap(), "ppt/slides/slide1.xml")).unwrap();
        assert!(raw.starts_with("<?xml"));
        assert!(raw.contains(r#"lang="en-US""#));
    }

    #[test]
    fn test_store_rejects_foreign_document() {
        let bytes = build_package(&["only"], &[1]);
        let mut package = PptxPackage::from_bytes(&bytes).unwrap();

        let err = package.store(&Document::new()).unwrap_err();
        assert!(matches!(err, Error::PptxParseError(_)));
    }
}

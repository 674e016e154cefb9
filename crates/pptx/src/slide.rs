//! Mapping between slide XML (PresentationML/DrawingML) and the deck model.
//!
//! Reading and writing walk the shape tree with the same classification, so
//! the n-th text frame read is the n-th text frame written back.

use crate::xml::{self, XmlElement, XmlNode};
use deckfill_core::{
    Cell, FontSize, Paragraph, Rgb, Run, RunFormat, Shape, Slide, Table, TextFrame,
};
use std::collections::BTreeMap;

/// Fill elements that may appear in `a:rPr`; at most one is allowed.
const FILL_ELEMENTS: &[&str] = &["noFill", "solidFill", "gradFill", "blipFill", "pattFill", "grpFill"];

/// `a:rPr` children that must come after `a:latin`.
const AFTER_LATIN: &[&str] = &["ea", "cs", "sym", "hlinkClick", "hlinkMouseOver", "rtl", "extLst"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeKind {
    Text,
    Table,
    Group,
    Other,
}

/// Classify a child of a shape tree; `None` for non-shape children such as
/// the group's own properties.
fn shape_kind(el: &XmlElement) -> Option<ShapeKind> {
    match el.local_name() {
        "sp" if el.child("txBody").is_some() => Some(ShapeKind::Text),
        "grpSp" => Some(ShapeKind::Group),
        "graphicFrame" if table_element(el).is_some() => Some(ShapeKind::Table),
        "sp" | "graphicFrame" | "pic" | "cxnSp" | "contentPart" | "AlternateContent" => {
            Some(ShapeKind::Other)
        }
        _ => None,
    }
}

fn table_element(frame: &XmlElement) -> Option<&XmlElement> {
    frame.path(&["graphic", "graphicData", "tbl"])
}

/// The `cNvPr@name` of a shape, from whichever `nv*Pr` block it has.
fn shape_name(el: &XmlElement) -> String {
    el.elements()
        .find(|child| child.local_name().starts_with("nv"))
        .and_then(|nv| nv.child("cNvPr"))
        .and_then(|c| c.attr("name"))
        .unwrap_or_default()
        .to_string()
}

/// Build the model of one slide from its `p:sld` root.
pub fn read_slide(root: &XmlElement, number: usize) -> Slide {
    let mut slide = Slide::new(number);
    if let Some(tree) = root.path(&["cSld", "spTree"]) {
        slide.shapes = read_shapes(tree);
    } else {
        log::warn!("Slide {} has no shape tree", number);
    }
    slide
}

fn read_shapes(tree: &XmlElement) -> Vec<Shape> {
    tree.elements()
        .filter_map(|el| shape_kind(el).map(|kind| read_shape(el, kind)))
        .collect()
}

fn read_shape(el: &XmlElement, kind: ShapeKind) -> Shape {
    let name = shape_name(el);
    match kind {
        ShapeKind::Text => Shape::Text {
            name,
            frame: el.child("txBody").map(read_frame).unwrap_or_default(),
        },
        ShapeKind::Table => Shape::Table {
            name,
            table: table_element(el).map(read_table).unwrap_or_default(),
        },
        ShapeKind::Group => Shape::Group {
            name,
            shapes: read_shapes(el),
        },
        ShapeKind::Other => Shape::Other { name },
    }
}

fn read_table(tbl: &XmlElement) -> Table {
    Table {
        rows: tbl
            .elements()
            .filter(|el| el.local_name() == "tr")
            .map(|tr| {
                tr.elements()
                    .filter(|el| el.local_name() == "tc")
                    .map(|tc| Cell {
                        frame: tc.child("txBody").map(read_frame).unwrap_or_default(),
                    })
                    .collect()
            })
            .collect(),
    }
}

fn read_wrap(body: &XmlElement) -> Option<bool> {
    match body.child("bodyPr").and_then(|pr| pr.attr("wrap")) {
        Some("square") => Some(true),
        Some("none") => Some(false),
        _ => None,
    }
}

fn read_frame(body: &XmlElement) -> TextFrame {
    let paragraphs = body
        .elements()
        .filter(|el| el.local_name() == "p")
        .map(read_paragraph)
        .collect();
    TextFrame {
        paragraphs,
        word_wrap: read_wrap(body),
    }
}

fn read_paragraph(p: &XmlElement) -> Paragraph {
    let runs = p
        .elements()
        .filter(|el| el.local_name() == "r")
        .enumerate()
        .map(|(ordinal, r)| {
            Run::new(r.child("t").map(XmlElement::text).unwrap_or_default())
                .with_format(read_format(r.child("rPr")))
                .with_origin(ordinal)
        })
        .collect();
    Paragraph::new(runs)
}

fn parse_bool(value: Option<&str>) -> Option<bool> {
    match value? {
        "1" | "true" | "on" => Some(true),
        "0" | "false" | "off" => Some(false),
        _ => None,
    }
}

fn parse_underline(value: Option<&str>) -> Option<bool> {
    value.map(|u| u != "none")
}

fn parse_size(value: Option<&str>) -> Option<FontSize> {
    value?.parse().ok().map(FontSize::from_centipoints)
}

fn read_color(rpr: &XmlElement) -> Option<Rgb> {
    let val = rpr.path(&["solidFill", "srgbClr"])?.attr("val")?;
    Rgb::from_hex(val).ok()
}

fn read_font(rpr: &XmlElement) -> Option<String> {
    rpr.child("latin")
        .and_then(|latin| latin.attr("typeface"))
        .map(str::to_string)
}

/// Typed formatting of an `a:rPr`, with the element itself kept as
/// passthrough.
pub fn read_format(rpr: Option<&XmlElement>) -> RunFormat {
    let Some(rpr) = rpr else {
        return RunFormat::default();
    };
    RunFormat {
        font: read_font(rpr),
        size: parse_size(rpr.attr("sz")),
        bold: parse_bool(rpr.attr("b")),
        italic: parse_bool(rpr.attr("i")),
        underline: parse_underline(rpr.attr("u")),
        color: read_color(rpr),
        passthrough: xml::write_fragment(rpr)
            .map_err(|e| log::warn!("Dropping unreadable run properties: {}", e))
            .ok(),
    }
}

/// Apply typed formatting onto an `a:rPr`. Attributes are only rewritten
/// when their value actually changes.
fn apply_format(rpr: &mut XmlElement, format: &RunFormat) {
    if let Some(size) = format.size {
        if parse_size(rpr.attr("sz")) != Some(size) {
            rpr.set_attr("sz", size.centipoints().to_string());
        }
    }
    if let Some(bold) = format.bold {
        if parse_bool(rpr.attr("b")) != Some(bold) {
            rpr.set_attr("b", if bold { "1" } else { "0" });
        }
    }
    if let Some(italic) = format.italic {
        if parse_bool(rpr.attr("i")) != Some(italic) {
            rpr.set_attr("i", if italic { "1" } else { "0" });
        }
    }
    if let Some(underline) = format.underline {
        if parse_underline(rpr.attr("u")) != Some(underline) {
            rpr.set_attr("u", if underline { "sng" } else { "none" });
        }
    }
    if let Some(color) = format.color {
        if read_color(rpr) != Some(color) {
            set_color(rpr, color);
        }
    }
    if let Some(font) = &format.font {
        if read_font(rpr).as_ref() != Some(font) {
            set_font(rpr, font);
        }
    }
}

fn set_color(rpr: &mut XmlElement, color: Rgb) {
    for fill in FILL_ELEMENTS {
        rpr.remove_children(fill);
    }
    let mut srgb = rpr.sibling_element("srgbClr");
    srgb.set_attr("val", color.to_hex());
    let mut solid = rpr.sibling_element("solidFill");
    solid.children.push(XmlNode::Element(srgb));

    let at = rpr.position_of_any(&["ln"]).map_or(0, |ln| ln + 1);
    rpr.children.insert(at, XmlNode::Element(solid));
}

fn set_font(rpr: &mut XmlElement, font: &str) {
    if let Some(latin) = rpr.child_mut("latin") {
        latin.set_attr("typeface", font);
        return;
    }
    let mut latin = rpr.sibling_element("latin");
    latin.set_attr("typeface", font);
    let at = rpr.position_of_any(AFTER_LATIN).unwrap_or(rpr.children.len());
    rpr.children.insert(at, XmlNode::Element(latin));
}

fn build_run(prefix: &str, run: &Run) -> XmlElement {
    let mut r = XmlElement::new(format!("{}r", prefix));

    let mut rpr = run
        .format
        .passthrough
        .as_deref()
        .and_then(|raw| {
            xml::parse_fragment(raw)
                .map_err(|e| log::warn!("Rebuilding run properties: {}", e))
                .ok()
        })
        .unwrap_or_else(|| XmlElement::new(format!("{}rPr", prefix)));
    apply_format(&mut rpr, &run.format);
    if !rpr.attributes.is_empty() || !rpr.children.is_empty() {
        r.children.push(XmlNode::Element(rpr));
    }

    let mut t = XmlElement::new(format!("{}t", prefix));
    if !run.text.is_empty() {
        t.children.push(XmlNode::Text(run.text.clone()));
    }
    r.children.push(XmlNode::Element(t));
    r
}

/// Rewrite the runs of an `a:p`. Runs from the source paragraph are written
/// where their original `a:r` stood, each followed by the runs split off
/// from it; all other children keep their place.
fn write_paragraph(p: &mut XmlElement, paragraph: &Paragraph) {
    let prefix = p.prefix().to_string();

    let mut leading: Vec<&Run> = Vec::new();
    let mut by_origin: BTreeMap<usize, Vec<&Run>> = BTreeMap::new();
    let mut current: Option<usize> = None;
    for run in &paragraph.runs {
        if let Some(origin) = run.origin {
            current = Some(origin);
        }
        match current {
            Some(origin) => by_origin.entry(origin).or_default().push(run),
            None => leading.push(run),
        }
    }

    let emit = |children: &mut Vec<XmlNode>, runs: &[&Run]| {
        children.extend(runs.iter().map(|run| XmlNode::Element(build_run(&prefix, run))));
    };

    let mut children = Vec::with_capacity(p.children.len() + paragraph.runs.len());
    let mut leading_done = leading.is_empty();
    let mut ordinal = 0;
    for node in std::mem::take(&mut p.children) {
        match node {
            XmlNode::Element(el) if el.local_name() == "r" => {
                if !leading_done {
                    emit(&mut children, &leading);
                    leading_done = true;
                }
                if let Some(runs) = by_origin.remove(&ordinal) {
                    emit(&mut children, &runs);
                }
                ordinal += 1;
            }
            XmlNode::Element(el) if el.local_name() == "endParaRPr" && !leading_done => {
                emit(&mut children, &leading);
                leading_done = true;
                children.push(XmlNode::Element(el));
            }
            other => children.push(other),
        }
    }
    if !leading_done {
        emit(&mut children, &leading);
    }
    p.children = children;
}

fn write_frame(body: &mut XmlElement, frame: &TextFrame) {
    if let Some(wrap) = frame.word_wrap {
        if read_wrap(body) != Some(wrap) {
            let value = if wrap { "square" } else { "none" };
            match body.child_mut("bodyPr") {
                Some(pr) => pr.set_attr("wrap", value),
                None => {
                    let mut pr = body.sibling_element("bodyPr");
                    pr.set_attr("wrap", value);
                    body.children.insert(0, XmlNode::Element(pr));
                }
            }
        }
    }

    let paragraphs = body.elements_mut().filter(|el| el.local_name() == "p");
    for (p, paragraph) in paragraphs.zip(&frame.paragraphs) {
        write_paragraph(p, paragraph);
    }
}

fn write_table(tbl: &mut XmlElement, table: &Table) {
    let rows = tbl.elements_mut().filter(|el| el.local_name() == "tr");
    for (tr, row) in rows.zip(&table.rows) {
        let cells = tr.elements_mut().filter(|el| el.local_name() == "tc");
        for (tc, cell) in cells.zip(row) {
            if let Some(body) = tc.child_mut("txBody") {
                write_frame(body, &cell.frame);
            }
        }
    }
}

fn write_shapes(tree: &mut XmlElement, shapes: &[Shape]) {
    let elements: Vec<&mut XmlElement> = tree
        .elements_mut()
        .filter(|el| shape_kind(el).is_some())
        .collect();
    if elements.len() != shapes.len() {
        log::warn!(
            "Shape count changed ({} in XML, {} in model), writing common prefix",
            elements.len(),
            shapes.len()
        );
    }
    for (el, shape) in elements.into_iter().zip(shapes) {
        match shape {
            Shape::Text { frame, .. } => {
                if let Some(body) = el.child_mut("txBody") {
                    write_frame(body, frame);
                }
            }
            Shape::Table { table, .. } => {
                if let Some(tbl) = el.path_mut(&["graphic", "graphicData", "tbl"]) {
                    write_table(tbl, table);
                }
            }
            Shape::Group { shapes, .. } => write_shapes(el, shapes),
            Shape::Other { .. } => {}
        }
    }
}

/// Write the model of one slide back into its `p:sld` root.
pub fn write_slide(root: &mut XmlElement, slide: &Slide) {
    if let Some(tree) = root.path_mut(&["cSld", "spTree"]) {
        write_shapes(tree, &slide.shapes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckfill_core::{apply_replacements, FillOptions, ReplacementTable};

    const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

    fn slide_xml(tree: &str) -> String {
        format!(
            r#"<p:sld {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld></p:sld>"#,
            NS, tree
        )
    }

    fn text_box(name: &str, paragraphs: &str) -> String {
        format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="{}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{}</p:txBody></p:sp>"#,
            name, paragraphs
        )
    }

    fn root(xml: &str) -> XmlElement {
        xml::parse(xml).unwrap().root
    }

    fn fill(root: &mut XmlElement, table: &ReplacementTable) -> Slide {
        let mut document = deckfill_core::Document::new();
        document.add_slide(read_slide(root, 1));
        apply_replacements(&mut document, table, &FillOptions::new());
        let slide = document.slides.remove(0);
        write_slide(root, &slide);
        slide
    }

    fn first_paragraph(root: &XmlElement) -> &XmlElement {
        root.path(&["cSld", "spTree", "sp", "txBody", "p"]).unwrap()
    }

    #[test]
    fn test_read_shapes_and_runs() {
        let xml = slide_xml(&format!(
            "{}{}",
            text_box(
                "Title 1",
                r#"<a:p><a:r><a:rPr lang="en-US" sz="4800" b="1"><a:solidFill><a:srgbClr val="112233"/></a:solidFill><a:latin typeface="Georgia"/></a:rPr><a:t>Hello </a:t></a:r><a:br/><a:r><a:t>[Name]</a:t></a:r></a:p>"#
            ),
            r#"<p:pic><p:nvPicPr><p:cNvPr id="3" name="Picture 3"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr></p:pic>"#
        ));
        let slide = read_slide(&root(&xml), 1);

        assert_eq!(slide.shapes.len(), 2);
        assert_eq!(slide.shapes[0].name(), "Title 1");
        assert_eq!(slide.shapes[1], Shape::Other { name: "Picture 3".into() });

        let Shape::Text { frame, .. } = &slide.shapes[0] else {
            panic!("expected text");
        };
        let runs = &frame.paragraphs[0].runs;
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].format.size, Some(FontSize::from_points(48.0)));
        assert_eq!(runs[0].format.bold, Some(true));
        assert_eq!(runs[0].format.color, Some(Rgb::new(0x11, 0x22, 0x33)));
        assert_eq!(runs[0].format.font.as_deref(), Some("Georgia"));
        assert_eq!(runs[1].origin, Some(1));
        assert_eq!(runs[1].format, RunFormat::default());
    }

    #[test]
    fn test_untouched_paragraph_writes_back_identically() {
        let xml = slide_xml(&text_box(
            "Body",
            r#"<a:p><a:pPr algn="ctr"/><a:r><a:rPr lang="en-US" b="1"/><a:t>No tokens</a:t></a:r><a:endParaRPr lang="en-US"/></a:p>"#,
        ));
        let original = root(&xml);
        let mut written = original.clone();

        fill(&mut written, &ReplacementTable::new());

        assert_eq!(first_paragraph(&written), first_paragraph(&original));
        let body_pr = written.path(&["cSld", "spTree", "sp", "txBody", "bodyPr"]).unwrap();
        assert_eq!(body_pr.attr("wrap"), Some("square"));
    }

    #[test]
    fn test_split_runs_are_written_after_their_source() {
        let xml = slide_xml(&text_box(
            "Body",
            r#"<a:p><a:r><a:rPr lang="en-US" i="1"/><a:t>Hi [Name]!</a:t></a:r><a:br/><a:r><a:t>tail</a:t></a:r><a:endParaRPr lang="en-US"/></a:p>"#,
        ));
        let mut tree = root(&xml);
        let mut table = ReplacementTable::new();
        table.insert_value("[Name]", "Jane Doe");

        fill(&mut tree, &table);

        let p = first_paragraph(&tree);
        let kinds: Vec<&str> = p.elements().map(XmlElement::local_name).collect();
        assert_eq!(kinds, vec!["r", "r", "r", "br", "r", "endParaRPr"]);
        let texts: Vec<String> = p
            .elements()
            .filter(|el| el.local_name() == "r")
            .map(|r| r.child("t").unwrap().text())
            .collect();
        assert_eq!(texts, vec!["Hi ", "Jane Doe", "!", "tail"]);

        let name_rpr = p.elements().nth(1).unwrap().child("rPr").unwrap();
        assert_eq!(p.elements().nth(1).unwrap().child("t").unwrap().text(), "Jane Doe");
        assert_eq!(name_rpr.attr("i"), Some("1"));
        assert_eq!(name_rpr.attr("lang"), Some("en-US"));
        assert_eq!(
            name_rpr.path(&["solidFill", "srgbClr"]).unwrap().attr("val"),
            Some("0066CC")
        );
        assert!(p.elements().next().unwrap().child("rPr").unwrap().child("solidFill").is_none());
    }

    #[test]
    fn test_token_split_across_runs_collapses_into_first() {
        let xml = slide_xml(&text_box(
            "Body",
            r#"<a:p><a:r><a:rPr lang="en-US" b="1"/><a:t>Dear [candi</a:t></a:r><a:r><a:rPr lang="en-US"/><a:t>date_name],</a:t></a:r></a:p>"#,
        ));
        let mut tree = root(&xml);
        let mut table = ReplacementTable::new();
        table.insert_value("[candidate_name]", "Ava");

        fill(&mut tree, &table);

        let texts: Vec<String> = first_paragraph(&tree)
            .elements()
            .map(|r| r.child("t").unwrap().text())
            .collect();
        assert_eq!(texts, vec!["Dear ", "Ava", ",", ""]);
        let name = first_paragraph(&tree).elements().nth(1).unwrap();
        assert_eq!(name.child("rPr").unwrap().attr("b"), Some("1"));
    }

    #[test]
    fn test_color_replaces_theme_fill() {
        let mut rpr = xml::parse_fragment(
            r#"<a:rPr lang="en-US"><a:ln w="10"/><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="Arial"/></a:rPr>"#,
        )
        .unwrap();
        let format = RunFormat {
            color: Some(Rgb::new(220, 53, 69)),
            font: Some("Verdana".into()),
            ..RunFormat::default()
        };

        apply_format(&mut rpr, &format);

        let kinds: Vec<&str> = rpr.elements().map(XmlElement::local_name).collect();
        assert_eq!(kinds, vec!["ln", "solidFill", "latin"]);
        assert_eq!(read_color(&rpr), Some(Rgb::new(220, 53, 69)));
        assert_eq!(read_font(&rpr).as_deref(), Some("Verdana"));
    }

    #[test]
    fn test_tables_and_groups_are_written() {
        let table = r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="4" name="Table 4"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm/><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblGrid><a:gridCol w="100"/></a:tblGrid><a:tr h="10"><a:tc><a:txBody><a:bodyPr/><a:p><a:r><a:t>[city]</a:t></a:r></a:p></a:txBody><a:tcPr/></a:tc></a:tr></a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#;
        let group = format!(
            r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="5" name="Group 5"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:grpSp>"#,
            text_box("Inner", r#"<a:p><a:r><a:t>From [city]</a:t></a:r></a:p>"#)
        );
        let mut tree = root(&slide_xml(&format!("{}{}", table, group)));
        let mut replacements = ReplacementTable::new();
        replacements.insert_value("[city]", "Oslo");

        let slide = fill(&mut tree, &replacements);
        assert!(matches!(slide.shapes[0], Shape::Table { .. }));

        let reread = read_slide(&tree, 1);
        let texts: Vec<String> = deckfill_core::Document {
            slides: vec![reread],
        }
        .text_frames()
        .iter()
        .map(|f| f.text())
        .collect();
        assert_eq!(texts, vec!["Oslo", "From Oslo"]);
        let cell_body = tree
            .path(&["cSld", "spTree", "graphicFrame", "graphic", "graphicData", "tbl", "tr", "tc", "txBody", "bodyPr"])
            .unwrap();
        assert_eq!(cell_body.attr("wrap"), Some("square"));
    }

    #[test]
    fn test_runs_created_in_empty_paragraph_go_before_end_properties() {
        let mut p = xml::parse_fragment(r#"<a:p><a:pPr/><a:endParaRPr lang="en-US"/></a:p>"#).unwrap();
        let paragraph = Paragraph::new(vec![Run::new("fresh")]);

        write_paragraph(&mut p, &paragraph);

        let kinds: Vec<&str> = p.elements().map(XmlElement::local_name).collect();
        assert_eq!(kinds, vec!["pPr", "r", "endParaRPr"]);
        let run = p.child("r").unwrap();
        assert!(run.child("rPr").is_none());
        assert_eq!(run.child("t").unwrap().text(), "fresh");
    }
}

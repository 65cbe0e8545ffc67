#![allow(dead_code)]

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;

pub const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const DOC_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture"><w:body>"#;
const DOC_CLOSE: &str = r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

pub const IMAGE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// Minimal DOCX assembled in memory.
pub struct DocxBuilder {
    blocks: Vec<String>,
    rels: Vec<(String, String, Option<&'static str>)>,
    media: Vec<(String, Vec<u8>)>,
    styles: bool,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            rels: Vec::new(),
            media: Vec::new(),
            styles: true,
        }
    }

    pub fn paragraph(mut self, xml: impl Into<String>) -> Self {
        self.blocks.push(xml.into());
        self
    }

    pub fn text(self, text: &str) -> Self {
        self.paragraph(text_paragraph(text))
    }

    /// Registers `word/media/<name>` under `rid`.
    pub fn media(mut self, rid: &str, name: &str, data: Vec<u8>) -> Self {
        self.rels
            .push((rid.to_string(), format!("media/{name}"), None));
        self.media.push((format!("word/media/{name}"), data));
        self
    }

    pub fn external_image(mut self, rid: &str, url: &str) -> Self {
        self.rels.push((rid.to_string(), url.to_string(), Some("External")));
        self
    }

    pub fn document_xml(&self) -> String {
        let mut xml = String::from(DOC_OPEN);
        for block in &self.blocks {
            xml.push_str(block);
        }
        xml.push_str(DOC_CLOSE);
        xml
    }

    pub fn build(&self) -> Vec<u8> {
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        if self.styles {
            rels.push_str(r#"<Relationship Id="rIdStyles" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#);
        }
        for (rid, target, mode) in &self.rels {
            let mode = mode.map(|m| format!(r#" TargetMode="{m}""#)).unwrap_or_default();
            rels.push_str(&format!(
                r#"<Relationship Id="{rid}" Type="{IMAGE_REL_TYPE}" Target="{target}"{mode}/>"#
            ));
        }
        rels.push_str("</Relationships>");

        let mut parts: Vec<(String, Vec<u8>)> = vec![
            ("[Content_Types].xml".into(), CONTENT_TYPES.as_bytes().to_vec()),
            ("_rels/.rels".into(), PACKAGE_RELS.as_bytes().to_vec()),
            ("word/document.xml".into(), self.document_xml().into_bytes()),
            ("word/_rels/document.xml.rels".into(), rels.into_bytes()),
        ];
        if self.styles {
            parts.push((
                "word/styles.xml".into(),
                format!(r#"<?xml version="1.0" encoding="UTF-8"?><w:styles xmlns:w="{WML_NS}"/>"#)
                    .into_bytes(),
            ));
        }
        parts.extend(self.media.iter().cloned());
        zip_parts(&parts)
    }
}

pub fn zip_parts(parts: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in parts {
        zip.start_file(name.as_str(), SimpleFileOptions::default())
            .unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn read_part(docx: &[u8], name: &str) -> Option<Vec<u8>> {
    let mut zip = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut entry = zip.by_name(name).ok()?;
    let mut data = Vec::new();
    entry.read_to_end(&mut data).unwrap();
    Some(data)
}

pub fn part_names(docx: &[u8]) -> Vec<String> {
    let zip = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    zip.file_names().map(String::from).collect()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

pub fn text_paragraph(text: &str) -> String {
    format!(r#"<w:p><w:r><w:t>{text}</w:t></w:r></w:p>"#)
}

/// A run holding one inline picture that references `rid`.
pub fn image_run(rid: &str) -> String {
    format!(
        r#"<w:r><w:rPr><w:noProof/></w:rPr><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="1905000" cy="1905000"/><wp:docPr id="1" name="Picture 1"/><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture"><pic:pic><pic:nvPicPr><pic:cNvPr id="0" name="image.png"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="{rid}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr/></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#
    )
}

pub fn image_paragraph(rid: &str) -> String {
    format!("<w:p>{}</w:p>", image_run(rid))
}

/// Text of every top-level paragraph; `w:br` reads as '\n', `w:tab` as '\t'.
pub fn paragraph_texts(document_xml: &str) -> Vec<String> {
    let xml = roxmltree::Document::parse(document_xml).unwrap();
    let body = xml
        .root_element()
        .children()
        .find(|n| n.has_tag_name((WML_NS, "body")))
        .unwrap();
    body.children()
        .filter(|n| n.has_tag_name((WML_NS, "p")))
        .map(|p| {
            let mut text = String::new();
            for node in p.descendants() {
                if node.has_tag_name((WML_NS, "t")) {
                    text.push_str(node.text().unwrap_or(""));
                } else if node.has_tag_name((WML_NS, "br")) {
                    text.push('\n');
                } else if node.has_tag_name((WML_NS, "tab")) {
                    text.push('\t');
                }
            }
            text
        })
        .collect()
}

/// Number of `w:drawing` elements in each top-level paragraph.
pub fn drawings_per_paragraph(document_xml: &str) -> Vec<usize> {
    let xml = roxmltree::Document::parse(document_xml).unwrap();
    let body = xml
        .root_element()
        .children()
        .find(|n| n.has_tag_name((WML_NS, "body")))
        .unwrap();
    body.children()
        .filter(|n| n.has_tag_name((WML_NS, "p")))
        .map(|p| {
            p.descendants()
                .filter(|n| n.has_tag_name((WML_NS, "drawing")))
                .count()
        })
        .collect()
}

/// Raw source text of each top-level paragraph.
pub fn paragraph_sources(document_xml: &str) -> Vec<String> {
    let xml = roxmltree::Document::parse(document_xml).unwrap();
    let body = xml
        .root_element()
        .children()
        .find(|n| n.has_tag_name((WML_NS, "body")))
        .unwrap();
    body.children()
        .filter(|n| n.has_tag_name((WML_NS, "p")))
        .map(|p| document_xml[p.range()].to_string())
        .collect()
}

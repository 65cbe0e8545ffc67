use std::collections::BTreeMap;
use std::ops::Range;

use crate::config::{ConvertConfig, MarkerStyle, TextMarkers};
use crate::error::Error;
use crate::model::{Coordinate, ExtractedText, ImageAnchor, ImageId, Placement, RewriteReport};

use super::{DocumentPackage, WML_NS, body, paragraphs, runs, wml};

/// Source text replacement computed against one parsed snapshot of the body.
struct Splice {
    range: Range<usize>,
    text: String,
}

/// How inserted WordprocessingML elements are spelled in this document.
struct Markup {
    prefix: String,
    /// No prefix is bound to the WML namespace where we insert, so every
    /// inserted top-level element declares `w` itself.
    declare: bool,
}

impl Markup {
    /// Spelling for elements inserted as children of `scope`.
    fn in_scope(scope: Option<roxmltree::Node>) -> Self {
        match scope
            .into_iter()
            .flat_map(|node| node.namespaces())
            .find(|ns| ns.uri() == WML_NS && ns.name().is_some())
            .and_then(|ns| ns.name())
        {
            Some(prefix) => Markup {
                prefix: prefix.to_string(),
                declare: false,
            },
            None => Markup {
                prefix: "w".to_string(),
                declare: true,
            },
        }
    }

    fn tag(&self, name: &str) -> String {
        format!("{}:{}", self.prefix, name)
    }

    fn open_root(&self, name: &str) -> String {
        if self.declare {
            format!("<{} xmlns:{}=\"{}\">", self.tag(name), self.prefix, WML_NS)
        } else {
            format!("<{}>", self.tag(name))
        }
    }

    fn empty(&self, name: &str) -> String {
        format!("<{}/>", self.tag(name))
    }

    fn val(&self, name: &str, value: &str) -> String {
        format!("<{} {}:val=\"{}\"/>", self.tag(name), self.prefix, value)
    }
}

#[derive(Clone, Copy)]
enum Segment {
    Marker,
    Text,
}

/// Applies recognized text to the document body at the coordinates the
/// locator recorded.
///
/// All coordinates are resolved against a single parse of the unmodified
/// body and turned into byte-range splices. Splices are produced and applied
/// in strictly descending coordinate order: `Below` only inserts after the
/// anchor's paragraph and `Replace` only touches the anchor's own run, so
/// every splice lies at or after the ones still pending and never moves
/// their offsets. Everything outside the spliced ranges stays byte-identical.
pub struct Rewriter {
    placement: Placement,
    markers: TextMarkers,
    style: MarkerStyle,
}

impl Rewriter {
    pub fn new(placement: Placement, markers: TextMarkers, style: MarkerStyle) -> Self {
        Self {
            placement,
            markers,
            style,
        }
    }

    pub fn from_config(config: &ConvertConfig) -> Self {
        Self::new(config.placement, config.markers.clone(), config.style)
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Fails only if the body cannot be parsed at all; a coordinate that no
    /// longer addresses a paragraph or run is logged and reported in
    /// [`RewriteReport::failed`].
    pub fn rewrite(
        &self,
        package: &mut DocumentPackage,
        anchors: &[ImageAnchor],
        texts: &ExtractedText,
    ) -> Result<RewriteReport, Error> {
        let mut report = RewriteReport::default();

        let mut pending: BTreeMap<Coordinate, Vec<(ImageId, &str)>> = BTreeMap::new();
        for anchor in anchors {
            let Some(text) = texts.get(&anchor.image_id) else {
                continue;
            };
            if text.trim().is_empty() {
                log::info!("No text to add for {}", anchor.image_id);
                report.blank.push(anchor.image_id);
                continue;
            }
            pending
                .entry(anchor.coordinate)
                .or_default()
                .push((anchor.image_id, text.as_str()));
        }
        if pending.is_empty() {
            return Ok(report);
        }
        for entries in pending.values_mut() {
            entries.sort_by_key(|(id, _)| *id);
        }

        let rewritten = {
            let source = package.body_xml();
            let xml = roxmltree::Document::parse(source)?;
            let body = body(&xml)?;
            let paragraphs = paragraphs(body);

            let mut splices = Vec::with_capacity(pending.len());
            for (coordinate, entries) in pending.iter().rev() {
                let ids = entries.iter().map(|(id, _)| *id);
                match self.plan(source, &paragraphs, *coordinate, entries) {
                    Ok(splice) => {
                        for id in ids {
                            log::info!("Added text for {id} at {coordinate}");
                            report.applied.push(id);
                        }
                        splices.push(splice);
                    }
                    Err(e) => {
                        for id in ids {
                            log::warn!("Skipping {id}: {e}");
                            report.failed.push(id);
                        }
                    }
                }
            }
            apply_splices(source, &splices)
        };

        report.applied.sort();
        report.failed.sort();
        package.replace_body(rewritten);
        Ok(report)
    }

    fn plan(
        &self,
        source: &str,
        paragraphs: &[roxmltree::Node],
        coordinate: Coordinate,
        entries: &[(ImageId, &str)],
    ) -> Result<Splice, Error> {
        let paragraph = paragraphs.get(coordinate.paragraph).ok_or_else(|| {
            Error::Mutation(format!(
                "paragraph {} does not exist ({} paragraphs)",
                coordinate.paragraph,
                paragraphs.len()
            ))
        })?;

        match self.placement {
            Placement::Below => {
                let markup = Markup::in_scope(paragraph.parent_element());
                let mut text = String::new();
                for (_, recognized) in entries {
                    text.push_str(&self.paragraph_xml(&markup, recognized));
                }
                let at = paragraph.range().end;
                Ok(Splice { range: at..at, text })
            }
            Placement::Replace => {
                let runs = runs(*paragraph);
                let run = runs.get(coordinate.run).ok_or_else(|| {
                    Error::Mutation(format!(
                        "run {} does not exist in paragraph {} ({} runs)",
                        coordinate.run,
                        coordinate.paragraph,
                        runs.len()
                    ))
                })?;
                let markup = Markup::in_scope(run.parent_element());
                let mut text = cleared_run(source, *run);
                for (_, recognized) in entries {
                    text.push_str(&self.runs_xml(&markup, recognized));
                }
                Ok(Splice {
                    range: run.range(),
                    text,
                })
            }
        }
    }

    fn paragraph_xml(&self, markup: &Markup, recognized: &str) -> String {
        let plain = Markup {
            prefix: markup.prefix.clone(),
            declare: false,
        };
        let mut xml = markup.open_root("p");
        xml.push_str(&self.runs_xml(&plain, recognized));
        xml.push_str(&format!("</{}>", markup.tag("p")));
        xml
    }

    /// Prefix marker, text, suffix marker; empty markers are left out.
    fn runs_xml(&self, markup: &Markup, recognized: &str) -> String {
        let mut xml = String::new();
        if !self.markers.prefix.is_empty() {
            xml.push_str(&self.run_xml(markup, Segment::Marker, &self.markers.prefix));
        }
        xml.push_str(&self.run_xml(markup, Segment::Text, recognized));
        if !self.markers.suffix.is_empty() {
            xml.push_str(&self.run_xml(markup, Segment::Marker, &self.markers.suffix));
        }
        xml
    }

    fn run_xml(&self, markup: &Markup, segment: Segment, text: &str) -> String {
        let mut xml = markup.open_root("r");
        xml.push_str(&format!("<{}>", markup.tag("rPr")));
        match segment {
            Segment::Marker => {
                let [r, g, b] = self.style.marker_color;
                xml.push_str(&markup.empty("b"));
                xml.push_str(&markup.val("color", &format!("{r:02X}{g:02X}{b:02X}")));
            }
            Segment::Text => {
                let half_points = (self.style.text_size_pt * 2.0).round().max(1.0) as u32;
                xml.push_str(&markup.val("sz", &half_points.to_string()));
            }
        }
        xml.push_str(&format!("</{}>", markup.tag("rPr")));
        push_run_content(&mut xml, markup, text);
        xml.push_str(&format!("</{}>", markup.tag("r")));
        xml
    }
}

/// The run's own start and end tags with only its `rPr` kept between them.
fn cleared_run(source: &str, run: roxmltree::Node) -> String {
    let range = run.range();
    let (Some(first), Some(last)) = (run.first_child(), run.last_child()) else {
        return source[range].to_string();
    };
    let open = &source[range.start..first.range().start];
    let close = &source[last.range().end..range.end];
    let props = wml(run, "rPr").map(|p| &source[p.range()]).unwrap_or("");
    format!("{open}{props}{close}")
}

/// Text as `w:t` segments with line breaks and tabs as their own elements.
fn push_run_content(xml: &mut String, markup: &Markup, text: &str) {
    let mut pending = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                flush_text(xml, markup, &mut pending);
                xml.push_str(&markup.empty("br"));
            }
            '\t' => {
                flush_text(xml, markup, &mut pending);
                xml.push_str(&markup.empty("tab"));
            }
            '&' => pending.push_str("&amp;"),
            '<' => pending.push_str("&lt;"),
            '>' => pending.push_str("&gt;"),
            c if is_xml_char(c) => pending.push(c),
            _ => {}
        }
    }
    flush_text(xml, markup, &mut pending);
}

fn flush_text(xml: &mut String, markup: &Markup, pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    let tag = markup.tag("t");
    xml.push_str(&format!("<{tag} xml:space=\"preserve\">{pending}</{tag}>"));
    pending.clear();
}

// OCR engines like to end pages with a form feed, which XML 1.0 forbids.
fn is_xml_char(c: char) -> bool {
    !(c < ' ' || c == '\u{FFFE}' || c == '\u{FFFF}')
}

fn apply_splices(source: &str, splices: &[Splice]) -> String {
    debug_assert!(
        splices
            .windows(2)
            .all(|w| w[1].range.end <= w[0].range.start)
    );
    let mut out = source.to_string();
    for splice in splices {
        out.replace_range(splice.range.clone(), &splice.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w() -> Markup {
        Markup {
            prefix: "w".into(),
            declare: false,
        }
    }

    #[test]
    fn breaks_tabs_and_escapes() {
        let mut xml = String::new();
        push_run_content(&mut xml, &w(), "a<b\r\nc\td&e\u{c}");
        assert_eq!(
            xml,
            "<w:t xml:space=\"preserve\">a&lt;b</w:t><w:br/>\
             <w:t xml:space=\"preserve\">c</w:t><w:tab/>\
             <w:t xml:space=\"preserve\">d&amp;e</w:t>"
        );
    }

    #[test]
    fn marker_only_text_has_no_empty_t() {
        let mut xml = String::new();
        push_run_content(&mut xml, &w(), "\n");
        assert_eq!(xml, "<w:br/>");
    }

    #[test]
    fn splices_apply_back_to_front() {
        let source = "0123456789";
        let splices = [
            Splice {
                range: 8..8,
                text: "X".into(),
            },
            Splice {
                range: 2..4,
                text: "YY".into(),
            },
        ];
        assert_eq!(apply_splices(source, &splices), "01YY4567X89");
    }
}

mod locate;
mod package;
mod rewrite;

pub use locate::{LocateOutcome, locate_images, scan_images};
pub use package::{DocumentPackage, MediaPart, Relationship};
pub use rewrite::Rewriter;

use crate::error::Error;

pub(super) const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub(super) const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(super) const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

pub(super) fn is_wml(node: roxmltree::Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(WML_NS)
}

pub(super) fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children().find(|n| is_wml(*n, name))
}

pub(super) fn wml_children<'a>(
    node: roxmltree::Node<'a, 'a>,
    name: &'a str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'a>> {
    node.children().filter(move |n| is_wml(*n, name))
}

pub(super) fn body<'a>(xml: &'a roxmltree::Document<'a>) -> Result<roxmltree::Node<'a, 'a>, Error> {
    let root = xml.root_element();
    if !(root.tag_name().name() == "document" && root.tag_name().namespace() == Some(WML_NS)) {
        return Err(Error::InvalidDocx(format!(
            "body part root is <{}>, expected w:document",
            root.tag_name().name()
        )));
    }
    wml(root, "body").ok_or_else(|| Error::InvalidDocx("missing w:body".into()))
}

/// Top-level paragraphs in document order. Paragraphs nested in tables,
/// content controls or text boxes are not addressable.
pub(super) fn paragraphs<'a>(body: roxmltree::Node<'a, 'a>) -> Vec<roxmltree::Node<'a, 'a>> {
    wml_children(body, "p").collect()
}

/// Runs that are direct children of the paragraph. Runs inside hyperlinks
/// or field wrappers are not counted.
pub(super) fn runs<'a>(paragraph: roxmltree::Node<'a, 'a>) -> Vec<roxmltree::Node<'a, 'a>> {
    wml_children(paragraph, "r").collect()
}

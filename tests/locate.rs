mod common;

use common::{DocxBuilder, image_paragraph, image_run, png};
use docxide_ocr::{Coordinate, DocumentPackage, ImageId, LocateOutcome, locate_images, scan_images};

fn open(builder: &DocxBuilder) -> DocumentPackage {
    DocumentPackage::open_bytes(&builder.build()).unwrap()
}

#[test]
fn document_without_images_yields_no_anchors() {
    let _ = env_logger::try_init();
    let package = open(&DocxBuilder::new().text("just words").text("more words"));
    assert!(locate_images(&package).unwrap().is_empty());
}

#[test]
fn anchors_follow_paragraph_then_run_order() {
    let builder = DocxBuilder::new()
        .text("title")
        .paragraph(format!(
            "<w:p><w:r><w:t>before</w:t></w:r>{}<w:r><w:t>between</w:t></w:r>{}</w:p>",
            image_run("rIdA"),
            image_run("rIdB")
        ))
        .text("gap")
        .paragraph(image_paragraph("rIdC"))
        .media("rIdA", "a.png", png(10, 10))
        .media("rIdB", "b.png", png(20, 20))
        .media("rIdC", "c.png", png(30, 30));
    let anchors = locate_images(&open(&builder)).unwrap();

    let found: Vec<(ImageId, Coordinate, &str)> = anchors
        .iter()
        .map(|a| (a.image_id, a.coordinate, a.relationship_id.as_str()))
        .collect();
    assert_eq!(
        found,
        vec![
            (ImageId(0), Coordinate::new(1, 1), "rIdA"),
            (ImageId(1), Coordinate::new(1, 3), "rIdB"),
            (ImageId(2), Coordinate::new(3, 0), "rIdC"),
        ]
    );
    assert!(anchors.windows(2).all(|w| w[0].coordinate < w[1].coordinate));
    assert_eq!(anchors[1].bytes, png(20, 20));
    assert_eq!(anchors[2].media_type.as_deref(), Some("image/png"));
}

#[test]
fn every_blip_in_a_drawing_becomes_an_anchor() {
    let group = r#"<w:p><w:r><w:drawing><wp:inline><a:graphic><a:graphicData><a:blip r:embed="rId1"/><a:blip r:embed="rId2"/></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#;
    let builder = DocxBuilder::new()
        .paragraph(group)
        .media("rId1", "one.png", png(5, 5))
        .media("rId2", "two.png", png(6, 6));
    let anchors = locate_images(&open(&builder)).unwrap();

    assert_eq!(anchors.len(), 2);
    assert!(anchors.iter().all(|a| a.coordinate == Coordinate::new(0, 0)));
    assert_eq!(anchors[0].relationship_id, "rId1");
    assert_eq!(anchors[1].relationship_id, "rId2");
}

#[test]
fn missing_relationship_is_skipped_and_location_continues() {
    let builder = DocxBuilder::new()
        .paragraph(image_paragraph("rIdGone"))
        .paragraph(image_paragraph("rIdWeb"))
        .paragraph(image_paragraph("rIdOk"))
        .external_image("rIdWeb", "https://example.com/x.png")
        .media("rIdOk", "ok.png", png(8, 8));
    let package = open(&builder);

    let outcomes = scan_images(&package).unwrap();
    assert_eq!(outcomes.len(), 3);
    assert!(matches!(
        &outcomes[0],
        LocateOutcome::Missing { relationship_id, .. } if relationship_id == "rIdGone"
    ));
    assert!(matches!(&outcomes[1], LocateOutcome::Missing { .. }));

    let anchors = locate_images(&package).unwrap();
    assert_eq!(anchors.len(), 1);
    assert_eq!(anchors[0].image_id, ImageId(0));
    assert_eq!(anchors[0].coordinate, Coordinate::new(2, 0));
}

#[test]
fn location_is_deterministic() {
    let builder = DocxBuilder::new()
        .paragraph(image_paragraph("rId1"))
        .text("middle")
        .paragraph(image_paragraph("rId2"))
        .media("rId1", "1.png", png(3, 3))
        .media("rId2", "2.png", png(4, 4));
    let package = open(&builder);

    let first = locate_images(&package).unwrap();
    let second = locate_images(&package).unwrap();
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.image_id, b.image_id);
        assert_eq!(a.coordinate, b.coordinate);
        assert_eq!(a.bytes, b.bytes);
    }
}

#[test]
fn images_outside_top_level_runs_are_ignored() {
    let in_table = format!(
        "<w:tbl><w:tr><w:tc>{}</w:tc></w:tr></w:tbl>",
        image_paragraph("rId1")
    );
    let in_hyperlink = format!("<w:p><w:hyperlink>{}</w:hyperlink></w:p>", image_run("rId1"));
    let builder = DocxBuilder::new()
        .paragraph(in_table)
        .paragraph(in_hyperlink)
        .paragraph(image_paragraph("rId1"))
        .media("rId1", "1.png", png(3, 3));
    let anchors = locate_images(&open(&builder)).unwrap();

    // The table is not a paragraph; the hyperlink paragraph has no direct runs.
    assert_eq!(anchors.len(), 1);
    assert_eq!(anchors[0].coordinate, Coordinate::new(1, 0));
}

#[test]
fn anchor_bytes_are_independent_of_the_package() {
    let builder = DocxBuilder::new()
        .paragraph(image_paragraph("rId1"))
        .media("rId1", "1.png", png(3, 3));
    let package = open(&builder);
    let mut anchors = locate_images(&package).unwrap();
    anchors[0].bytes.clear();

    assert_eq!(package.resolve("rId1").unwrap().data, png(3, 3));
}

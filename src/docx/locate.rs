use crate::error::Error;
use crate::model::{Coordinate, ImageAnchor, ImageId};

use super::{DML_NS, DocumentPackage, REL_NS, body, paragraphs, runs, wml_children};

/// Result of resolving one image reference found in the body.
#[derive(Debug)]
pub enum LocateOutcome {
    Resolved(ImageAnchor),
    Missing {
        coordinate: Coordinate,
        relationship_id: String,
        reason: Error,
    },
}

/// Walk the body and resolve every image reference reachable through
/// paragraph → run → drawing → blip, in document order.
/// Ids count resolved images only.
pub fn scan_images(package: &DocumentPackage) -> Result<Vec<LocateOutcome>, Error> {
    let xml = roxmltree::Document::parse(package.body_xml())?;
    let body = body(&xml)?;

    let mut outcomes = Vec::new();
    let mut next_id = 0;
    for (p_idx, paragraph) in paragraphs(body).into_iter().enumerate() {
        for (r_idx, run) in runs(paragraph).into_iter().enumerate() {
            let coordinate = Coordinate::new(p_idx, r_idx);
            for drawing in wml_children(run, "drawing") {
                for rid in blip_embeds(drawing) {
                    let outcome = match package.resolve(rid) {
                        Ok(media) => {
                            let anchor = ImageAnchor {
                                image_id: ImageId(next_id),
                                coordinate,
                                relationship_id: rid.to_string(),
                                media_type: media.media_type,
                                bytes: media.data,
                            };
                            next_id += 1;
                            log::debug!(
                                "Located {} ({}, {} bytes) at {}",
                                anchor.image_id,
                                media.part_name,
                                anchor.bytes.len(),
                                coordinate
                            );
                            LocateOutcome::Resolved(anchor)
                        }
                        Err(reason) => LocateOutcome::Missing {
                            coordinate,
                            relationship_id: rid.to_string(),
                            reason,
                        },
                    };
                    outcomes.push(outcome);
                }
            }
        }
    }
    Ok(outcomes)
}

/// Every resolvable image anchor, ordered by ascending coordinate. References
/// that cannot be resolved are logged and dropped.
pub fn locate_images(package: &DocumentPackage) -> Result<Vec<ImageAnchor>, Error> {
    let anchors: Vec<ImageAnchor> = scan_images(package)?
        .into_iter()
        .filter_map(|outcome| match outcome {
            LocateOutcome::Resolved(anchor) => Some(anchor),
            LocateOutcome::Missing {
                coordinate,
                relationship_id,
                reason,
            } => {
                log::warn!(
                    "Failed to extract image with rId {relationship_id} at {coordinate}: {reason}"
                );
                None
            }
        })
        .collect();
    debug_assert!(anchors.windows(2).all(|w| w[0].coordinate <= w[1].coordinate));
    log::info!("Total images located: {}", anchors.len());
    Ok(anchors)
}

fn blip_embeds<'a>(drawing: roxmltree::Node<'a, 'a>) -> impl Iterator<Item = &'a str> {
    drawing
        .descendants()
        .filter(|n| n.tag_name().name() == "blip" && n.tag_name().namespace() == Some(DML_NS))
        .filter_map(|n| n.attribute((REL_NS, "embed")))
}

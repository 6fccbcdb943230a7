//! Replace inline payloads with repository paths.
//!
//! Pure transformation: produces the rewritten document plus the worklist of
//! files the commit builder must write. Traversal order is site background,
//! then blocks in document order (image, video, background, then grid cells
//! depth-first, row-major); it only decides the `-<index>` filename suffixes.

use tracing::debug;

use super::inline::{is_pending, parse_inline, MediaType};
use super::validate::ValidationError;
use super::AssetPolicy;
use crate::document::model::{Background, Block, ContentDocument};

/// An extracted asset waiting to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAsset {
    /// Repository-relative path, e.g. `assets/uploads/1700000000000-0.png`.
    pub path: String,
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
}

impl PendingAsset {
    pub fn mime_type(&self) -> &'static str {
        self.media_type.mime()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Document whose asset fields now hold `/<path>` references.
    pub document: ContentDocument,
    pub assets: Vec<PendingAsset>,
}

/// Extract every inline asset from `document`.
///
/// Takes the document by value: callers clone the live document first, and
/// on error the partially rewritten copy is simply dropped. `timestamp_ms` is
/// fixed once per publish attempt.
pub fn extract_assets(
    mut document: ContentDocument,
    policy: &AssetPolicy,
    timestamp_ms: i64,
) -> Result<Extraction, ValidationError> {
    let mut extractor = Extractor {
        policy,
        timestamp_ms,
        assets: Vec::new(),
    };

    extractor.background(&mut document.site.background, "site.background")?;
    document.try_walk_blocks_mut(&mut |block| extractor.block(block))?;

    debug!(
        assets = extractor.assets.len(),
        bytes = extractor.assets.iter().map(|a| a.bytes.len()).sum::<usize>(),
        "asset extraction complete"
    );

    Ok(Extraction {
        document,
        assets: extractor.assets,
    })
}

/// Number of allow-listed inline payloads still present in `document`.
pub fn pending_asset_count(document: &ContentDocument) -> usize {
    let pending_bg = |bg: &Background| bg.image_data_url.as_deref().is_some_and(is_pending);
    let mut count = usize::from(pending_bg(&document.site.background));
    document.walk_blocks(&mut |block| {
        count += [&block.image, &block.video]
            .into_iter()
            .flatten()
            .filter(|media| is_pending(&media.src))
            .count();
        count += usize::from(pending_bg(&block.background));
    });
    count
}

struct Extractor<'p> {
    policy: &'p AssetPolicy,
    timestamp_ms: i64,
    assets: Vec<PendingAsset>,
}

impl Extractor<'_> {
    fn block(&mut self, block: &mut Block) -> Result<(), ValidationError> {
        let id = block.id.to_string();
        if let Some(image) = &mut block.image {
            self.rewrite(&mut image.src, &format!("block {id} image"))?;
        }
        if let Some(video) = &mut block.video {
            self.rewrite(&mut video.src, &format!("block {id} video"))?;
        }
        self.background(&mut block.background, &format!("block {id} background"))
    }

    /// Inactive image payloads are extracted too, so none survive publish.
    fn background(&mut self, bg: &mut Background, location: &str) -> Result<(), ValidationError> {
        match &mut bg.image_data_url {
            Some(url) => self.rewrite(url, location),
            None => Ok(()),
        }
    }

    fn rewrite(&mut self, slot: &mut String, location: &str) -> Result<(), ValidationError> {
        let Some(asset) = parse_inline(slot, location, self.policy.max_bytes)? else {
            return Ok(());
        };
        let path = self.policy.asset_path(
            self.timestamp_ms,
            self.assets.len(),
            asset.media_type.extension(),
        );
        debug!(location, path = %path, bytes = asset.bytes.len(), "extracted inline asset");

        *slot = format!("/{path}");
        self.assets.push(PendingAsset {
            path,
            bytes: asset.bytes,
            media_type: asset.media_type,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::document::normalize::normalize;

    const TS: i64 = 1_700_000_000_000;
    // 1x1 transparent PNG.
    const PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";
    const GIF: &str = "R0lGODlhAQABAAAAACw=";

    fn data_url(mime: &str, b64: &str) -> String {
        format!("data:{mime};base64,{b64}")
    }

    #[test]
    fn extracts_in_traversal_order() {
        let doc = normalize(&json!({
            "site": { "background": { "type": "image", "imageDataUrl": data_url("image/gif", GIF) } },
            "blocks": [
                { "id": "a", "type": "text", "text": { "value": "hi" } },
                { "id": "b", "type": "image", "image": { "src": data_url("image/png", PNG), "alt": "cake" },
                  "background": { "type": "image", "imageDataUrl": data_url("image/jpeg", GIF) } }
            ]
        }));
        assert_eq!(pending_asset_count(&doc), 3);

        let out = extract_assets(doc, &AssetPolicy::default(), TS).unwrap();
        let paths: Vec<&str> = out.assets.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "assets/uploads/1700000000000-0.gif",
                "assets/uploads/1700000000000-1.png",
                "assets/uploads/1700000000000-2.jpg",
            ]
        );
        assert_eq!(
            out.document.site.background.image_data_url.as_deref(),
            Some("/assets/uploads/1700000000000-0.gif")
        );
        let image = out.document.blocks[1].image.as_ref().unwrap();
        assert_eq!(image.src, "/assets/uploads/1700000000000-1.png");
        assert_eq!(image.alt, "cake");
        assert_eq!(out.assets[1].mime_type(), "image/png");
        assert_eq!(pending_asset_count(&out.document), 0);
    }

    #[test]
    fn nested_grid_assets_are_found() {
        let doc = normalize(&json!({ "blocks": [{
            "type": "grid",
            "grid": { "cols": 2, "rows": 1, "cells": [
                null,
                { "type": "grid", "grid": { "cols": 1, "rows": 1, "cells": [
                    { "id": "deep", "type": "image", "image": { "src": data_url("image/webp", GIF) } }
                ]}}
            ]}
        }]}));

        let out = extract_assets(doc, &AssetPolicy::default(), TS).unwrap();
        assert_eq!(out.assets.len(), 1);
        assert_eq!(out.assets[0].path, "assets/uploads/1700000000000-0.webp");

        let outer = out.document.blocks[0].grid.as_ref().unwrap();
        let inner = outer.cells[1].as_ref().unwrap().grid.as_ref().unwrap();
        let deep = inner.cells[0].as_ref().unwrap();
        assert_eq!(deep.image.as_ref().unwrap().src, "/assets/uploads/1700000000000-0.webp");
    }

    #[test]
    fn inactive_background_payload_is_extracted() {
        let doc = normalize(&json!({ "blocks": [{
            "background": { "type": "solid", "imageDataUrl": data_url("image/png", PNG) }
        }]}));
        let out = extract_assets(doc, &AssetPolicy::default(), TS).unwrap();
        assert_eq!(out.assets.len(), 1);
        assert_eq!(
            out.document.blocks[0].background.image_data_url.as_deref(),
            Some("/assets/uploads/1700000000000-0.png")
        );
    }

    #[test]
    fn non_pending_values_are_untouched() {
        let raw = json!({ "blocks": [
            { "type": "image", "image": { "src": "/assets/uploads/1-0.png" } },
            { "type": "image", "image": { "src": "data:image/svg+xml;base64,PHN2Zz4=" } },
            { "type": "video", "video": { "src": "data:video/mp4;base64,AAAA" } }
        ]});
        let doc = normalize(&raw);
        let out = extract_assets(doc.clone(), &AssetPolicy::default(), TS).unwrap();
        assert!(out.assets.is_empty());
        assert_eq!(out.document, doc);
    }

    #[test]
    fn oversized_asset_fails_whole_extraction() {
        let big = "A".repeat(4 * 64);
        let doc = normalize(&json!({ "blocks": [
            { "id": "ok", "type": "image", "image": { "src": data_url("image/png", PNG) } },
            { "id": "huge", "type": "image", "image": { "src": data_url("image/png", &big) } }
        ]}));
        let policy = AssetPolicy {
            max_bytes: 100,
            ..AssetPolicy::default()
        };
        let err = extract_assets(doc, &policy, TS).unwrap_err();
        match err {
            ValidationError::AssetTooLarge { location, size, limit } => {
                assert_eq!(location, "block huge image");
                assert_eq!(size, 192);
                assert_eq!(limit, 100);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn n_assets_map_one_to_one() {
        let blocks: Vec<_> = (0..5)
            .map(|i| json!({ "id": format!("img{i}"), "type": "image", "image": { "src": data_url("image/png", PNG) } }))
            .collect();
        let doc = normalize(&json!({ "blocks": blocks }));
        let out = extract_assets(doc, &AssetPolicy::default(), TS).unwrap();

        assert_eq!(out.assets.len(), 5);
        for (block, asset) in out.document.blocks.iter().zip(&out.assets) {
            assert_eq!(block.image.as_ref().unwrap().src, format!("/{}", asset.path));
        }
        let serialized = serde_json::to_string(&out.document).unwrap();
        assert!(!serialized.contains(";base64,"));
    }
}

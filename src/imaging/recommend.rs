//! Output format recommendations.
//!
//! A classification picks one bucket of the catalog (transparency beats
//! photo beats graphic, since transparency rules out the most formats), and
//! the bucket's lists are filtered down to what the backend can write.

use super::classify::ImageClassification;
use super::formats::{AvailableFormatSet, CategoryKey, category};
use serde::Serialize;
use std::collections::HashSet;

/// Ranked format choices for one image or batch.
///
/// `recommended` and `compatible` are disjoint and only contain installed formats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecommendationResult {
    pub recommended: Vec<String>,
    pub compatible: Vec<String>,
}

impl RecommendationResult {
    pub fn contains(&self, code: &str) -> bool {
        self.recommended
            .iter()
            .chain(&self.compatible)
            .any(|f| f.eq_ignore_ascii_case(code))
    }
}

/// Which catalog bucket a classification falls into.
pub fn bucket_for(classification: &ImageClassification) -> CategoryKey {
    if classification.has_transparency {
        CategoryKey::Transparency
    } else if classification.is_photo {
        CategoryKey::Photo
    } else {
        CategoryKey::Graphic
    }
}

/// Recommend output formats for one classified image.
///
/// The original format is appended to `compatible` when the backend supports
/// it and no list already mentions it, so re-exporting to the uploaded
/// format is always offered.
pub fn recommend(
    classification: &ImageClassification,
    available: &AvailableFormatSet,
) -> RecommendationResult {
    let bucket = category(bucket_for(classification));
    let mut seen = HashSet::new();

    let recommended = filter_available(bucket.recommended, available, &mut seen);
    let mut compatible = filter_available(bucket.compatible, available, &mut seen);

    if let Some(original) = &classification.original_format {
        let original = original.to_ascii_uppercase();
        if available.contains(&original) && seen.insert(original.clone()) {
            compatible.push(original);
        }
    }

    RecommendationResult {
        recommended,
        compatible,
    }
}

fn filter_available(
    codes: &[&str],
    available: &AvailableFormatSet,
    seen: &mut HashSet<String>,
) -> Vec<String> {
    codes
        .iter()
        .filter(|code| available.contains(code))
        .map(|code| code.to_string())
        .filter(|code| seen.insert(code.clone()))
        .collect()
}

/// Summary of a heterogeneous batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchClassification {
    pub has_transparency: bool,
    pub has_photos: bool,
    pub has_graphics: bool,
}

impl BatchClassification {
    /// OR together the flags of every member.
    pub fn combine<'a>(members: impl IntoIterator<Item = &'a ImageClassification>) -> Self {
        members
            .into_iter()
            .fold(Self::default(), |acc, c| Self {
                has_transparency: acc.has_transparency || c.has_transparency,
                has_photos: acc.has_photos || c.is_photo,
                has_graphics: acc.has_graphics || !c.is_photo,
            })
    }

    /// A single classification standing in for the batch; no original format applies.
    pub fn as_classification(&self) -> ImageClassification {
        ImageClassification {
            has_transparency: self.has_transparency,
            is_photo: self.has_photos,
            original_format: None,
        }
    }
}

/// Recommend formats for a batch of already-classified images.
pub fn recommend_batch<'a>(
    members: impl IntoIterator<Item = &'a ImageClassification>,
    available: &AvailableFormatSet,
) -> (BatchClassification, RecommendationResult) {
    let summary = BatchClassification::combine(members);
    let result = recommend(&summary.as_classification(), available);
    (summary, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available() -> AvailableFormatSet {
        AvailableFormatSet::from_codes([
            "PNG", "JPEG", "GIF", "TIFF", "BMP", "WEBP", "AVIF", "ICO", "ARW", "PSD", "PCX",
        ])
    }

    fn photo() -> ImageClassification {
        ImageClassification {
            has_transparency: false,
            is_photo: true,
            original_format: Some("JPEG".into()),
        }
    }

    fn assert_invariants(result: &RecommendationResult, available: &AvailableFormatSet) {
        for code in result.recommended.iter().chain(&result.compatible) {
            assert!(available.contains(code), "{code} not available");
        }
        for code in &result.recommended {
            assert!(!result.compatible.contains(code), "{code} in both lists");
        }
    }

    #[test]
    fn photo_bucket_orders_by_catalog() {
        let result = recommend(&photo(), &available());
        assert_eq!(result.recommended, vec!["JPEG", "WEBP", "AVIF", "TIFF"]);
        assert_eq!(result.compatible, vec!["ARW", "PNG", "BMP"]);
        assert_invariants(&result, &available());
    }

    #[test]
    fn transparency_beats_photo() {
        let c = ImageClassification {
            has_transparency: true,
            ..photo()
        };
        assert_eq!(bucket_for(&c), CategoryKey::Transparency);
        let result = recommend(&c, &available());
        assert_eq!(result.recommended, vec!["PNG", "WEBP", "AVIF", "GIF"]);
        assert_eq!(result.compatible, vec!["TIFF", "ICO", "PSD", "JPEG"]);
        assert_invariants(&result, &available());
    }

    #[test]
    fn graphic_bucket() {
        let c = ImageClassification {
            has_transparency: false,
            is_photo: false,
            original_format: Some("PNG".into()),
        };
        let result = recommend(&c, &available());
        assert_eq!(result.recommended, vec!["PNG", "WEBP", "GIF"]);
        assert_eq!(
            result.compatible,
            vec!["JPEG", "TIFF", "BMP", "PCX", "ICO"]
        );
        assert_invariants(&result, &available());
    }

    #[test]
    fn uncategorized_original_appended_once() {
        let c = ImageClassification {
            original_format: Some("pcx".into()),
            ..photo()
        };
        let first = recommend(&c, &available());
        assert_eq!(first.compatible.last().map(String::as_str), Some("PCX"));
        assert_eq!(first.compatible.iter().filter(|f| *f == "PCX").count(), 1);

        let second = recommend(&c, &available());
        assert_eq!(first, second);
    }

    #[test]
    fn unavailable_original_is_not_appended() {
        let c = ImageClassification {
            original_format: Some("XCF".into()),
            ..photo()
        };
        let result = recommend(&c, &available());
        assert!(!result.contains("XCF"));
    }

    #[test]
    fn already_recommended_original_not_duplicated() {
        let result = recommend(&photo(), &available());
        assert_eq!(
            result
                .recommended
                .iter()
                .chain(&result.compatible)
                .filter(|f| *f == "JPEG")
                .count(),
            1
        );
    }

    #[test]
    fn fallback_set_still_yields_recommendations() {
        let result = recommend(&photo(), &AvailableFormatSet::fallback());
        assert_eq!(result.recommended, vec!["JPEG", "WEBP", "TIFF"]);
        assert_eq!(result.compatible, vec!["PNG", "BMP"]);
    }

    #[test]
    fn batch_ors_flags_and_drops_original() {
        let graphic = ImageClassification {
            has_transparency: false,
            is_photo: false,
            original_format: Some("GIF".into()),
        };
        let alpha = ImageClassification {
            has_transparency: true,
            is_photo: true,
            original_format: Some("PNG".into()),
        };
        let members = [photo(), graphic, alpha];

        let (summary, result) = recommend_batch(&members, &available());
        assert_eq!(
            summary,
            BatchClassification {
                has_transparency: true,
                has_photos: true,
                has_graphics: true,
            }
        );
        assert_eq!(summary.as_classification().original_format, None);
        assert_eq!(result.recommended[0], "PNG");
        assert_invariants(&result, &available());
    }

    #[test]
    fn empty_batch_is_graphic() {
        let members: [ImageClassification; 0] = [];
        let (summary, result) = recommend_batch(&members, &available());
        assert_eq!(summary, BatchClassification::default());
        assert_eq!(result.recommended, vec!["PNG", "WEBP", "GIF"]);
    }
}

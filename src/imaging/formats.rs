//! Format catalog: the static category taxonomy and the set of formats the
//! installed backend can actually handle.
//!
//! The capability listing (`magick -list format`) looks like:
//!
//! ```text
//!    Format  Mode  Description
//! -------------------------------------------------------------------------------
//!       3FR  r--   Hasselblad CFV/H3D39II Raw Format (0.22.0-Release)
//!       PNG* rw+   Portable Network Graphics (libpng 1.6.43)
//!            See http://www.libpng.org/ for details about the PNG format.
//! ```
//!
//! Some builds insert a `Module` column between name and mode, so the mode is
//! located as the first token shaped like `[r-][w-][+-]` rather than by index.

use super::backend::ConversionBackend;
use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock, RwLock};

/// Formats returned when the backend cannot be queried.
pub const FALLBACK_FORMATS: &[&str] = &["PNG", "JPEG", "GIF", "TIFF", "BMP", "WEBP"];

/// Container formats ImageMagick can read through ffmpeg; out of scope for
/// still-image conversion.
pub const VIDEO_CONTAINERS: &[&str] = &[
    "3G2", "3GP", "AVI", "FLV", "M2V", "M4V", "MKV", "MOV", "MP4", "MPEG", "MPG", "OGV", "WEBM",
    "WMV",
];

/// Named bucket in the format taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKey {
    Transparency,
    Photo,
    Graphic,
    Icon,
    Animation,
    Archive,
}

impl CategoryKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transparency => "transparency",
            Self::Photo => "photo",
            Self::Graphic => "graphic",
            Self::Icon => "icon",
            Self::Animation => "animation",
            Self::Archive => "archive",
        }
    }
}

/// Static catalog entry. `recommended` formats are the best fit for the
/// category, most broadly useful first; `compatible` ones work but are niche.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatCategory {
    pub key: CategoryKey,
    pub display_name: &'static str,
    pub recommended: &'static [&'static str],
    pub compatible: &'static [&'static str],
}

impl FormatCategory {
    /// All member formats in catalog order, without duplicates.
    pub fn member_formats(&self) -> Vec<&'static str> {
        let mut seen = BTreeSet::new();
        self.recommended
            .iter()
            .chain(self.compatible)
            .copied()
            .filter(|f| seen.insert(*f))
            .collect()
    }
}

const CATEGORIES: &[FormatCategory] = &[
    FormatCategory {
        key: CategoryKey::Transparency,
        display_name: "Transparent images",
        recommended: &["PNG", "WEBP", "AVIF", "HEIC", "GIF"],
        compatible: &["TIFF", "ICO", "JXL", "PSD", "SVG", "TGA"],
    },
    FormatCategory {
        key: CategoryKey::Photo,
        display_name: "Photographs",
        recommended: &["JPEG", "WEBP", "AVIF", "HEIC", "JXL", "TIFF"],
        compatible: &[
            "ARW", "CR2", "CR3", "NEF", "NRW", "ORF", "RAF", "RW2", "PEF", "DNG", "IIQ", "KDC",
            "3FR", "MEF", "MRW", "SRF", "X3F", "PNG", "BMP", "PPM", "JP2", "HDR", "EXR", "DPX",
            "MIFF", "MNG", "PCD", "RGBE", "YCBCR", "CALS",
        ],
    },
    FormatCategory {
        key: CategoryKey::Graphic,
        display_name: "Graphics and illustrations",
        recommended: &["PNG", "WEBP", "GIF", "SVG"],
        compatible: &[
            "JPEG", "TIFF", "BMP", "PCX", "TGA", "ICO", "WBMP", "XPM", "DIB", "EMF", "WMF", "PICT",
            "EPT", "EPDF", "EPI", "EPS", "EPSF", "EPSI", "PDF", "PS", "AI", "MONO",
        ],
    },
    FormatCategory {
        key: CategoryKey::Icon,
        display_name: "Icons",
        recommended: &["ICO", "ICNS", "PNG", "SVG"],
        compatible: &["CUR", "XPM", "XBM", "BMP"],
    },
    FormatCategory {
        key: CategoryKey::Animation,
        display_name: "Animations",
        recommended: &["GIF", "WEBP", "APNG", "AVIF"],
        compatible: &["MNG", "JXL", "HEIC"],
    },
    FormatCategory {
        key: CategoryKey::Archive,
        display_name: "Archival and print",
        recommended: &["TIFF", "PNG", "JXL", "PDF"],
        compatible: &["JP2", "DPX", "EXR", "MIFF", "PSD"],
    },
];

/// The full static taxonomy, in a fixed order.
pub fn categories() -> &'static [FormatCategory] {
    CATEGORIES
}

/// Look up one category by key.
pub fn category(key: CategoryKey) -> &'static FormatCategory {
    CATEGORIES
        .iter()
        .find(|c| c.key == key)
        .unwrap_or(&CATEGORIES[0])
}

/// Uppercase format codes the backend can read or write.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AvailableFormatSet(BTreeSet<String>);

impl AvailableFormatSet {
    /// Build a set from arbitrary codes, normalizing case and dropping
    /// video containers.
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            codes
                .into_iter()
                .map(|c| normalize_code(c.as_ref()))
                .filter(|c| !c.is_empty() && !is_video_container(c))
                .collect(),
        )
    }

    pub fn fallback() -> Self {
        Self::from_codes(FALLBACK_FORMATS)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.contains(&normalize_code(code))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

fn normalize_code(code: &str) -> String {
    code.trim()
        .trim_end_matches(['*', '+', '-'])
        .to_ascii_uppercase()
}

fn is_video_container(code: &str) -> bool {
    VIDEO_CONTAINERS.contains(&code)
}

/// Parse a mode token such as `rw+`, returning `(readable, writable)`.
fn parse_mode(token: &str) -> Option<(bool, bool)> {
    let bytes = token.as_bytes();
    if bytes.len() != 3 {
        return None;
    }
    let read = match bytes[0] {
        b'r' => true,
        b'-' => false,
        _ => return None,
    };
    let write = match bytes[1] {
        b'w' => true,
        b'-' => false,
        _ => return None,
    };
    if !matches!(bytes[2], b'+' | b'-') {
        return None;
    }
    Some((read, write))
}

/// Parse a `magick -list format` listing into the set of usable formats.
///
/// Lines without a mode token (headers, separators, wrapped descriptions)
/// are skipped, as are formats that can be neither read nor written.
pub fn parse_format_listing(listing: &str) -> AvailableFormatSet {
    let codes = listing.lines().filter_map(|line| {
        let mut tokens = line.split_whitespace();
        let name = tokens.next()?;
        if name.starts_with("--") || name.eq_ignore_ascii_case("format") {
            return None;
        }
        let (read, write) = tokens.take(2).find_map(parse_mode)?;
        (read || write).then_some(name)
    });
    AvailableFormatSet::from_codes(codes)
}

/// Query the backend and parse its listing, failing soft to [`FALLBACK_FORMATS`].
pub fn query_available_formats(backend: &impl ConversionBackend) -> AvailableFormatSet {
    match backend.list_formats() {
        Ok(listing) => {
            let formats = parse_format_listing(&listing);
            if formats.is_empty() {
                tracing::warn!("format listing had no usable entries, using fallback set");
                AvailableFormatSet::fallback()
            } else {
                tracing::debug!(count = formats.len(), "parsed backend format listing");
                formats
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not query backend formats, using fallback set");
            AvailableFormatSet::fallback()
        }
    }
}

/// Process-wide cache of the backend's available formats.
///
/// Populated on first use and only re-queried through [`FormatCatalog::refresh`].
#[derive(Debug, Default)]
pub struct FormatCatalog {
    available: RwLock<Option<Arc<AvailableFormatSet>>>,
}

static GLOBAL_CATALOG: LazyLock<FormatCatalog> = LazyLock::new(FormatCatalog::new);

impl FormatCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog shared by the whole process.
    pub fn global() -> &'static FormatCatalog {
        &GLOBAL_CATALOG
    }

    /// Cached available formats, querying the backend on first use.
    pub fn available(&self, backend: &impl ConversionBackend) -> Arc<AvailableFormatSet> {
        if let Some(cached) = self.read_cache() {
            return cached;
        }
        let mut guard = self
            .available
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Another thread may have populated it while we waited.
        if let Some(cached) = guard.as_ref() {
            return Arc::clone(cached);
        }
        let formats = Arc::new(query_available_formats(backend));
        *guard = Some(Arc::clone(&formats));
        formats
    }

    /// Discard the cached set and query the backend again.
    pub fn refresh(&self, backend: &impl ConversionBackend) -> Arc<AvailableFormatSet> {
        let formats = Arc::new(query_available_formats(backend));
        let mut guard = self
            .available
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(Arc::clone(&formats));
        formats
    }

    fn read_cache(&self) -> Option<Arc<AvailableFormatSet>> {
        self.available
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};

    const LISTING: &str = "   Format  Mode  Description
-------------------------------------------------------------------------------
      3FR  r--   Hasselblad CFV/H3D39II Raw Format (0.22.0-Release)
      AVI* r--   Microsoft Audio/Visual Interleaved
     JPEG* rw-   Joint Photographic Experts Group JFIF format (libjpeg-turbo 3.0.2)
      MP4* rw+   MPEG-4 Video Stream
      PNG* rw+   Portable Network Graphics (libpng 1.6.43)
           See http://www.libpng.org/ for details about the PNG format.
     WEBP* rw+   WebP Image Format (libwebp 1.4.0 [020F])
     NULL  ---   Constant image of uniform color
      SVG  rw+   Scalable Vector Graphics (RSVG 2.58.0)

* native blob support
r read support
w write support
+ support for multiple images
";

    #[test]
    fn parses_readable_and_writable_formats() {
        let formats = parse_format_listing(LISTING);
        let codes: Vec<&str> = formats.iter().collect();
        assert_eq!(codes, vec!["3FR", "JPEG", "PNG", "SVG", "WEBP"]);
    }

    #[test]
    fn skips_description_continuations_and_legend() {
        let formats = parse_format_listing(LISTING);
        assert!(!formats.contains("SEE"));
        assert!(!formats.contains("FORMAT"));
        assert!(!formats.contains("R"));
    }

    #[test]
    fn excludes_video_containers_and_unusable_formats() {
        let formats = parse_format_listing(LISTING);
        assert!(!formats.contains("MP4"));
        assert!(!formats.contains("AVI"));
        assert!(!formats.contains("NULL"));
    }

    #[test]
    fn parses_listing_with_module_column() {
        let listing = "   Format  Module    Mode  Description\n\
                       -----------------------------------------\n\
                       \x20     GIF* GIF       rw+   CompuServe graphics interchange format\n\
                       \x20   GIF87* GIF       rw-   CompuServe graphics interchange format\n";
        let formats = parse_format_listing(listing);
        assert!(formats.contains("GIF"));
        assert!(formats.contains("GIF87"));
        assert_eq!(formats.len(), 2);
    }

    #[test]
    fn contains_is_case_insensitive() {
        let formats = AvailableFormatSet::from_codes(["png", "Jpeg"]);
        assert!(formats.contains("PNG"));
        assert!(formats.contains("jpeg"));
        assert!(!formats.contains("GIF"));
    }

    #[test]
    fn query_failure_returns_fallback() {
        let backend = MockBackend::new();
        let formats = query_available_formats(&backend);
        assert_eq!(formats, AvailableFormatSet::fallback());
        assert_eq!(formats.len(), 6);
    }

    #[test]
    fn empty_listing_returns_fallback() {
        let backend = MockBackend::new().with_formats("garbage\n\n");
        assert_eq!(
            query_available_formats(&backend),
            AvailableFormatSet::fallback()
        );
    }

    #[test]
    fn catalog_queries_once_until_refresh() {
        let backend = MockBackend::new().with_formats(LISTING);
        let catalog = FormatCatalog::new();

        let first = catalog.available(&backend);
        let second = catalog.available(&backend);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            backend
                .get_operations()
                .iter()
                .filter(|op| **op == RecordedOp::ListFormats)
                .count(),
            1
        );

        catalog.refresh(&backend);
        assert_eq!(backend.get_operations().len(), 2);
    }

    #[test]
    fn categories_cover_full_taxonomy() {
        let keys: Vec<CategoryKey> = categories().iter().map(|c| c.key).collect();
        assert_eq!(
            keys,
            vec![
                CategoryKey::Transparency,
                CategoryKey::Photo,
                CategoryKey::Graphic,
                CategoryKey::Icon,
                CategoryKey::Animation,
                CategoryKey::Archive,
            ]
        );
    }

    #[test]
    fn member_formats_deduplicate() {
        let members = category(CategoryKey::Graphic).member_formats();
        let unique: BTreeSet<_> = members.iter().collect();
        assert_eq!(members.len(), unique.len());
        assert_eq!(&members[..4], &["PNG", "WEBP", "GIF", "SVG"]);
    }

    #[test]
    fn catalog_codes_are_uppercase() {
        for cat in categories() {
            for code in cat.member_formats() {
                assert_eq!(code, code.to_ascii_uppercase(), "{code} in {:?}", cat.key);
            }
        }
    }
}

//! Image classification types.
//!
//! Every slot produces exactly two captures: a UV-free shot and an ASET shot.
//! Each capture has an original and a low-res preview ("thumb"), giving four
//! storage objects per slot.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The two capture types recorded per diamond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageType {
    UvFree,
    Aset,
}

impl ImageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::UvFree => "UV_FREE",
            ImageType::Aset => "ASET",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UV_FREE" => Some(ImageType::UvFree),
            "ASET" => Some(ImageType::Aset),
            _ => None,
        }
    }

    pub const ALL: [ImageType; 2] = [ImageType::UvFree, ImageType::Aset];
}

impl std::fmt::Display for ImageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the four storage objects a slot produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    UvFree,
    Aset,
    UvFreeThumb,
    AsetThumb,
}

impl ImageKind {
    /// Filename suffix used by the canonical path function.
    pub fn suffix(&self) -> &'static str {
        match self {
            ImageKind::UvFree => "uv_free",
            ImageKind::Aset => "aset",
            ImageKind::UvFreeThumb => "uv_free_thumb",
            ImageKind::AsetThumb => "aset_thumb",
        }
    }

    pub fn is_original(&self) -> bool {
        matches!(self, ImageKind::UvFree | ImageKind::Aset)
    }

    /// The capture this object belongs to.
    pub fn image_type(&self) -> ImageType {
        match self {
            ImageKind::UvFree | ImageKind::UvFreeThumb => ImageType::UvFree,
            ImageKind::Aset | ImageKind::AsetThumb => ImageType::Aset,
        }
    }

    pub const ALL: [ImageKind; 4] = [
        ImageKind::UvFree,
        ImageKind::Aset,
        ImageKind::UvFreeThumb,
        ImageKind::AsetThumb,
    ];
}

/// Which of the four objects a signed-URL request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SignedUrlMode {
    Both,
    Previews,
    Originals,
}

impl SignedUrlMode {
    pub fn includes(&self, kind: ImageKind) -> bool {
        match self {
            SignedUrlMode::Both => true,
            SignedUrlMode::Previews => !kind.is_original(),
            SignedUrlMode::Originals => kind.is_original(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_type_wire_format() {
        assert_eq!(
            serde_json::to_string(&ImageType::UvFree).unwrap(),
            "\"UV_FREE\""
        );
        assert_eq!(ImageType::parse("ASET"), Some(ImageType::Aset));
        assert_eq!(ImageType::parse("aset"), None);
    }

    #[test]
    fn test_kind_classification() {
        assert!(ImageKind::UvFree.is_original());
        assert!(!ImageKind::AsetThumb.is_original());
        assert_eq!(ImageKind::UvFreeThumb.image_type(), ImageType::UvFree);
        assert_eq!(ImageKind::Aset.image_type(), ImageType::Aset);
    }

    #[test]
    fn test_mode_selection() {
        assert!(SignedUrlMode::Both.includes(ImageKind::UvFree));
        assert!(SignedUrlMode::Both.includes(ImageKind::UvFreeThumb));
        assert!(SignedUrlMode::Originals.includes(ImageKind::Aset));
        assert!(!SignedUrlMode::Originals.includes(ImageKind::AsetThumb));
        assert!(SignedUrlMode::Previews.includes(ImageKind::AsetThumb));
        assert!(!SignedUrlMode::Previews.includes(ImageKind::Aset));
    }
}

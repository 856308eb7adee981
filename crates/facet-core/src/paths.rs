//! Canonical storage-path derivation.
//!
//! Storage object paths are a pure function of the logical coordinate
//! (org, job, ring, slot, kind). Nothing else in the system may invent
//! paths: recomputing the function for the same coordinate must always
//! yield the same path, which is what makes signed-URL issuance
//! side-effect-free and confirm-originals freely retryable.

use crate::error::AppError;
use crate::models::ImageKind;
use uuid::Uuid;

/// Bucket-relative path for one storage object:
/// `{org_slug}/{job_id}/{ring_label}/slot_{slot_index}_{kind}.jpg`
pub fn object_path(
    org_slug: &str,
    job_id: Uuid,
    ring_label: &str,
    slot_index: i32,
    kind: ImageKind,
) -> String {
    format!(
        "{}/{}/{}/slot_{}_{}.jpg",
        org_slug,
        job_id,
        ring_label,
        slot_index,
        kind.suffix()
    )
}

/// All four canonical paths for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPaths {
    pub uv_free: String,
    pub aset: String,
    pub uv_free_thumb: String,
    pub aset_thumb: String,
}

impl SlotPaths {
    pub fn for_slot(org_slug: &str, job_id: Uuid, ring_label: &str, slot_index: i32) -> Self {
        SlotPaths {
            uv_free: object_path(org_slug, job_id, ring_label, slot_index, ImageKind::UvFree),
            aset: object_path(org_slug, job_id, ring_label, slot_index, ImageKind::Aset),
            uv_free_thumb: object_path(
                org_slug,
                job_id,
                ring_label,
                slot_index,
                ImageKind::UvFreeThumb,
            ),
            aset_thumb: object_path(
                org_slug,
                job_id,
                ring_label,
                slot_index,
                ImageKind::AsetThumb,
            ),
        }
    }

    pub fn for_kind(&self, kind: ImageKind) -> &str {
        match kind {
            ImageKind::UvFree => &self.uv_free,
            ImageKind::Aset => &self.aset,
            ImageKind::UvFreeThumb => &self.uv_free_thumb,
            ImageKind::AsetThumb => &self.aset_thumb,
        }
    }
}

/// The authorization boundary for storage paths: a device key is not
/// org-scoped, so every path a request operates on must sit under the
/// literal `{org_slug}/{job_id}/` prefix of that request's coordinate.
pub fn path_owned_by(path: &str, org_slug: &str, job_id: Uuid) -> bool {
    let path = path.trim_start_matches('/');
    let prefix = format!("{}/{}/", org_slug, job_id);
    path.starts_with(&prefix)
}

/// Reject coordinates that would corrupt the path structure.
pub fn validate_coordinate(
    org_slug: &str,
    ring_label: &str,
    slot_index: i32,
) -> Result<(), AppError> {
    if org_slug.is_empty() || org_slug.contains('/') {
        return Err(AppError::InvalidInput(format!(
            "Invalid org_slug '{}'",
            org_slug
        )));
    }
    if ring_label.is_empty() || ring_label.contains('/') {
        return Err(AppError::InvalidInput(format!(
            "Invalid ring_label '{}'",
            ring_label
        )));
    }
    if slot_index < 0 {
        return Err(AppError::InvalidInput(format!(
            "Invalid slot_index {}: must be >= 0",
            slot_index
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Uuid {
        Uuid::parse_str("7f3a2c9e-1b4d-4e6f-8a90-123456789abc").unwrap()
    }

    #[test]
    fn test_object_path_shape() {
        let path = object_path("acme", job(), "A", 0, ImageKind::UvFree);
        assert_eq!(
            path,
            "acme/7f3a2c9e-1b4d-4e6f-8a90-123456789abc/A/slot_0_uv_free.jpg"
        );
    }

    #[test]
    fn test_object_path_is_deterministic() {
        for kind in ImageKind::ALL {
            let first = object_path("acme", job(), "B", 12, kind);
            let second = object_path("acme", job(), "B", 12, kind);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_slot_paths_cover_all_kinds() {
        let paths = SlotPaths::for_slot("acme", job(), "A", 3);
        assert!(paths.uv_free.ends_with("slot_3_uv_free.jpg"));
        assert!(paths.aset.ends_with("slot_3_aset.jpg"));
        assert!(paths.uv_free_thumb.ends_with("slot_3_uv_free_thumb.jpg"));
        assert!(paths.aset_thumb.ends_with("slot_3_aset_thumb.jpg"));
        assert_eq!(paths.for_kind(ImageKind::Aset), &paths.aset);
    }

    #[test]
    fn test_ownership_prefix() {
        let path = object_path("acme", job(), "A", 0, ImageKind::Aset);
        assert!(path_owned_by(&path, "acme", job()));
        assert!(!path_owned_by(&path, "other-org", job()));
        assert!(!path_owned_by(&path, "acme", Uuid::new_v4()));
        // Leading slash is normalized, not a bypass.
        assert!(path_owned_by(&format!("/{}", path), "acme", job()));
        // A slug that is a prefix of another must not match.
        assert!(!path_owned_by("acmeplus/x/y.jpg", "acme", job()));
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(validate_coordinate("acme", "A", 0).is_ok());
        assert!(validate_coordinate("", "A", 0).is_err());
        assert!(validate_coordinate("ac/me", "A", 0).is_err());
        assert!(validate_coordinate("acme", "", 0).is_err());
        assert!(validate_coordinate("acme", "A/B", 0).is_err());
        assert!(validate_coordinate("acme", "A", -1).is_err());
    }
}

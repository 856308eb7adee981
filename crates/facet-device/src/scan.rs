//! Slot discovery in a capture folder.
//!
//! The capture rig writes `slot_<n>_uv_free.jpg` and `slot_<n>_aset.jpg`
//! per slot. A slot is only queued when both captures are present.

use anyhow::{Context, Result};
use facet_core::models::ImageType;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Both capture files for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotCapture {
    pub slot_index: i32,
    pub uv_free: PathBuf,
    pub aset: PathBuf,
}

/// Parse `slot_<n>_uv_free.jpg` / `slot_<n>_aset.jpg`.
fn parse_slot_filename(name: &str) -> Option<(i32, ImageType)> {
    let stem = name.strip_suffix(".jpg").or_else(|| name.strip_suffix(".jpeg"))?;
    let rest = stem.strip_prefix("slot_")?;

    if let Some(index) = rest.strip_suffix("_uv_free") {
        return index.parse().ok().map(|i| (i, ImageType::UvFree));
    }
    if let Some(index) = rest.strip_suffix("_aset") {
        return index.parse().ok().map(|i| (i, ImageType::Aset));
    }
    None
}

/// Scan a folder and pair captures into slots, ordered by slot index.
pub fn discover_slots(folder: &Path) -> Result<Vec<SlotCapture>> {
    let mut uv_free: BTreeMap<i32, PathBuf> = BTreeMap::new();
    let mut aset: BTreeMap<i32, PathBuf> = BTreeMap::new();

    let entries = std::fs::read_dir(folder)
        .with_context(|| format!("Failed to read capture folder {}", folder.display()))?;

    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        match parse_slot_filename(name) {
            Some((index, ImageType::UvFree)) => {
                uv_free.insert(index, entry.path());
            }
            Some((index, ImageType::Aset)) => {
                aset.insert(index, entry.path());
            }
            None => {}
        }
    }

    let mut slots = Vec::new();
    for (index, uv_free_path) in &uv_free {
        match aset.get(index) {
            Some(aset_path) => slots.push(SlotCapture {
                slot_index: *index,
                uv_free: uv_free_path.clone(),
                aset: aset_path.clone(),
            }),
            None => {
                tracing::warn!(slot_index = index, "Slot has a UV-free capture but no ASET capture, skipping");
            }
        }
    }
    for index in aset.keys() {
        if !uv_free.contains_key(index) {
            tracing::warn!(slot_index = index, "Slot has an ASET capture but no UV-free capture, skipping");
        }
    }

    Ok(slots)
}

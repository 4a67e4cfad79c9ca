use std::collections::HashSet;
use thiserror::Error;

/// Video container extensions accepted for upload (lowercase, no dot).
pub const PERMITTED_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamingError {
    #[error("filename contains path separators")]
    PathTraversal,

    #[error("no free destination name after {0} probes")]
    StorageExhausted(u32),
}

/// Returns true when the filename carries one of the permitted video
/// container extensions, compared case-insensitively.
pub fn is_permitted_media_type(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_lowercase();
            PERMITTED_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Splits a base name into (stem, extension). The extension starts at the
/// last dot and keeps it, matching how suffixed variants are rebuilt below.
/// A name without a dot has an empty extension.
pub fn split_stem(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) => name.split_at(idx),
        None => (name, ""),
    }
}

/// Picks the destination name for an upload inside one owner's partition.
///
/// The requested name is returned unchanged when it is free; otherwise the
/// suffixed variants `stem_1.ext`, `stem_2.ext`, ... are probed in ascending
/// order and the first free one wins, so the smallest positive suffix is
/// always chosen. The probe count is bounded: a directory pathological enough
/// to exhaust `max_probes` fails this one upload rather than spinning.
///
/// Pure function over a listing snapshot. The snapshot may be stale by the
/// time the caller writes; the storage layer must commit with
/// exclusive-create semantics and retry with a fresh listing on conflict.
pub fn resolve_destination_name(
    existing: &HashSet<String>,
    requested: &str,
    max_probes: u32,
) -> Result<String, NamingError> {
    // The caller strips path components before we run; treat any separator
    // that survives as a hard failure rather than a directory.
    if requested.contains('/') || requested.contains('\\') {
        return Err(NamingError::PathTraversal);
    }

    if !existing.contains(requested) {
        return Ok(requested.to_string());
    }

    let (stem, ext) = split_stem(requested);
    for index in 1..=max_probes {
        let candidate = format!("{stem}_{index}{ext}");
        if !existing.contains(&candidate) {
            return Ok(candidate);
        }
    }

    Err(NamingError::StorageExhausted(max_probes))
}

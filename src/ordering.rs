//! File ordering engine: from a working set of paired files to the exact
//! sequence of paths handed to the document pipeline.
//!
//! Two distinct orderings live here and must not be conflated:
//!
//! 1. **Pairing order** ([`pair_files`]) — when the raw upload set changes,
//!    the working set is rebuilt from scratch: files sorted by original
//!    filename using natural ordering (digit runs compared numerically),
//!    sequential order keys 1..N assigned, every removed flag reset. Any
//!    manual reordering or removal the user did before is discarded.
//!
//! 2. **Merge order** ([`merge_order`]) — at submit time, surviving entries
//!    sort by the composite key `(order-key-as-string, original filename)`.
//!    Order keys compare **as strings**: key 10 sorts before key 2 because
//!    `"10" < "2"` lexicographically. This reproduces observed production
//!    behavior; changing it to a numeric comparison is a product decision
//!    tracked outside this repo (see DESIGN.md).

use std::cmp::Ordering;
use std::path::PathBuf;

use serde::Serialize;

use crate::output::human_size;

/// One user-submitted file pending processing.
///
/// The temp on-disk handle behind `path` is owned by the transport layer,
/// which reclaims it after pipeline consumption or session end. Identity is
/// `original_name` plus arrival index — never the order key, which is
/// user-editable and not unique.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    /// Client-side filename, e.g. `scan-003.pdf`.
    pub original_name: String,
    /// MIME type as reported by the transport (`application/pdf`, `image/*`).
    pub content_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Location of the temporary upload on disk.
    pub path: PathBuf,
}

/// An uploaded file annotated with ordering/UI state.
#[derive(Debug, Clone, Serialize)]
pub struct PairedFile {
    pub file: UploadedFile,
    /// User-editable merge position. Not unique; ties fall through to the
    /// filename.
    pub order: i64,
    /// Excluded from the merge when true. Toggle-only.
    pub removed: bool,
    /// Human-formatted size for display.
    pub display_size: String,
}

/// Rebuild the paired working set from a fresh upload set.
///
/// Sorts by original filename (natural order), assigns order keys 1..N, and
/// resets every removed flag. Called whenever the raw upload set changes.
pub fn pair_files(mut files: Vec<UploadedFile>) -> Vec<PairedFile> {
    files.sort_by(|a, b| natural_cmp(&a.original_name, &b.original_name));
    files
        .into_iter()
        .enumerate()
        .map(|(index, file)| {
            let display_size = human_size(file.size);
            PairedFile {
                file,
                order: index as i64 + 1,
                removed: false,
                display_size,
            }
        })
        .collect()
}

/// Produce the exact path sequence for the document pipeline.
///
/// Filters out removed entries, sorts the survivors by
/// `(order.to_string(), original_name)` ascending, and projects to paths.
/// Deterministic for fixed inputs; the result is consumed once per
/// submission. Emptiness is the caller's contract violation — submission
/// validation guarantees at least one surviving file.
pub fn merge_order(paired: &[PairedFile]) -> Vec<PathBuf> {
    let mut surviving: Vec<&PairedFile> = paired.iter().filter(|p| !p.removed).collect();
    surviving.sort_by(|a, b| {
        // String comparison of the order key is intentional; see module docs.
        (a.order.to_string(), &a.file.original_name)
            .cmp(&(b.order.to_string(), &b.file.original_name))
    });
    surviving.into_iter().map(|p| p.file.path.clone()).collect()
}

/// Natural filename comparison: digit runs compare numerically, everything
/// else compares byte-wise case-sensitively.
///
/// `page2.pdf` sorts before `page10.pdf`. Leading zeros lose ties to the
/// shorter run (`002` > `2`) so the ordering stays total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ia = a.as_bytes().iter().copied().peekable();
    let mut ib = b.as_bytes().iter().copied().peekable();

    loop {
        match (ia.peek().copied(), ib.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let (na, la) = take_digits(&mut ia);
                    let (nb, lb) = take_digits(&mut ib);
                    match na.cmp(&nb) {
                        Ordering::Equal => match la.cmp(&lb) {
                            Ordering::Equal => continue,
                            other => return other,
                        },
                        other => return other,
                    }
                }
                match ca.cmp(&cb) {
                    Ordering::Equal => {
                        ia.next();
                        ib.next();
                    }
                    other => return other,
                }
            }
        }
    }
}

/// Consume a digit run, returning its numeric value and length.
fn take_digits(it: &mut std::iter::Peekable<impl Iterator<Item = u8>>) -> (u64, usize) {
    let mut value: u64 = 0;
    let mut len = 0;
    while let Some(&c) = it.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        value = value.saturating_mul(10).saturating_add((c - b'0') as u64);
        len += 1;
        it.next();
    }
    (value, len)
}

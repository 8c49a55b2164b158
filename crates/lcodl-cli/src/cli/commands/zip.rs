//! `--zipfile`: one archive-built package per filter.

use lcodl_core::pipeline::SavedZip;
use lcodl_core::plan::FilterGroup;

pub fn print_zip_start(group: &FilterGroup) {
    println!(
        "Requesting a zip of {} frames in filter {}...",
        group.frames.len(),
        group.filter
    );
}

pub fn print_zip_saved(zip: &SavedZip) {
    println!(
        "Wrote {} ({:.1} MiB).",
        zip.path.display(),
        zip.bytes as f64 / 1_048_576.0
    );
}

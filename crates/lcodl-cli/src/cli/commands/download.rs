//! Individual frame downloads through the batch downloader.

use std::path::Path;

use lcodl_core::batch::BatchReport;
use lcodl_core::options::Options;
use lcodl_core::plan::DownloadPlan;

const MIB: f64 = 1_048_576.0;

pub fn print_download_start(opts: &Options, plan: &DownloadPlan) {
    if plan.root == Path::new(".") {
        println!("\nFrames will be written to the current directory.");
    } else {
        println!("\nFrames will be written to {}.", plan.root.display());
    }
    println!(
        "Downloading {} frames starting at frame {} ({} streams)...\n",
        plan.total_frames(),
        opts.start,
        opts.streams
    );
}

/// Per-frame failures are listed here; they do not fail the run.
pub fn print_download_summary(report: &BatchReport) {
    println!(
        "\nSaved {} of {} frames ({:.1} MiB).",
        report.saved,
        report.total,
        report.bytes as f64 / MIB
    );
    if !report.failures.is_empty() {
        println!("*** Failed to download {} frames:", report.failures.len());
        for f in &report.failures {
            println!("\t{}: {}", f.file_name, f.error);
        }
    }
}

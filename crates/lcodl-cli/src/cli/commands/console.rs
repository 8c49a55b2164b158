//! Terminal output for a run: each pipeline step printed as it happens.

use std::io::IsTerminal;

use lcodl_core::batch::{
    select_byte_progress, select_progress_sink, BatchReport, ByteProgressSink, ProgressSink,
};
use lcodl_core::options::Options;
use lcodl_core::pipeline::{RequestLookup, RunObserver, SavedZip};
use lcodl_core::plan::{DownloadPlan, FilterGroup};

use super::{
    print_counts, print_download_start, print_download_summary, print_request_info,
    print_zip_saved, print_zip_start,
};

pub struct Console {
    frames: Box<dyn ProgressSink>,
    bytes: Box<dyn ByteProgressSink>,
}

impl Console {
    /// Bars when stderr is a terminal, plain lines otherwise.
    pub fn detect() -> Self {
        let interactive = std::io::stderr().is_terminal();
        Self {
            frames: select_progress_sink(interactive),
            bytes: select_byte_progress(interactive),
        }
    }
}

impl RunObserver for Console {
    fn request_looked_up(&mut self, request_id: &str, lookup: &RequestLookup) {
        print_request_info(request_id, lookup);
    }

    fn planned(&mut self, opts: &Options, plan: &DownloadPlan) {
        print_counts(opts, plan);
    }

    fn frames_starting(&mut self, opts: &Options, plan: &DownloadPlan) {
        print_download_start(opts, plan);
    }

    fn frames_done(&mut self, report: &BatchReport) {
        print_download_summary(report);
    }

    fn zip_starting(&mut self, group: &FilterGroup) {
        print_zip_start(group);
    }

    fn zip_saved(&mut self, zip: &SavedZip) {
        print_zip_saved(zip);
    }

    fn frame_progress(&mut self) -> &mut dyn ProgressSink {
        self.frames.as_mut()
    }

    fn byte_progress(&mut self) -> &mut dyn ByteProgressSink {
        self.bytes.as_mut()
    }
}

//! Batch downloader: fetch every selected frame into its destination file.
//!
//! How transfers are scheduled (sequential loop or bounded pool) is a
//! `FetchStrategy`; how progress is shown is a `ProgressSink`. Both are picked
//! once at startup. A frame that fails after its retries is recorded in the
//! report and never stops the remaining transfers.

mod progress;
mod strategy;

pub use progress::{
    select_byte_progress, select_progress_sink, BarProgress, BatchProgress, ByteBar,
    ByteProgressSink, ByteSteps, LineProgress, ProgressSink, ProgressUpdate,
};
pub use strategy::{select_strategy, FetchStrategy, Pooled, Sequential};

use std::path::{Path, PathBuf};

use crate::archive::Frame;
use crate::retry::{run_with_retry, RetryPolicy, TransferError};

/// Source of frame bytes. Implemented by `ArchiveClient`; tests substitute fakes.
pub trait FrameFetcher: Sync {
    /// Write the frame's content to `dest`, replacing it. Returns bytes written.
    fn fetch(&self, frame: &Frame, dest: &Path) -> Result<u64, TransferError>;
}

/// One frame and where it goes.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub frame: Frame,
    pub dest: PathBuf,
}

/// Outcome of a single job, as handed from the strategy back to the collector.
pub type JobResult = Result<u64, TransferError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFailure {
    pub file_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub total: usize,
    pub saved: usize,
    pub bytes: u64,
    pub failures: Vec<FrameFailure>,
}

impl BatchReport {
    pub fn all_saved(&self) -> bool {
        self.failures.is_empty() && self.saved == self.total
    }
}

/// Local file name for a frame. Only the last path component of the server name is used.
pub fn local_file_name(frame: &Frame) -> String {
    Path::new(&frame.filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .map(str::to_string)
        .unwrap_or_else(|| format!("frame-{}", frame.id))
}

/// `{dir}/{file_name}` for each frame, order preserved.
pub fn plan_jobs(frames: &[Frame], dir: &Path) -> Vec<DownloadJob> {
    frames
        .iter()
        .map(|frame| DownloadJob {
            frame: frame.clone(),
            dest: dir.join(local_file_name(frame)),
        })
        .collect()
}

/// Download every job with `strategy`, retrying transient failures per `retry`.
/// An empty job list returns an empty report without touching `fetcher`.
pub fn download_batch(
    fetcher: &dyn FrameFetcher,
    jobs: Vec<DownloadJob>,
    strategy: &dyn FetchStrategy,
    retry: &RetryPolicy,
    sink: &mut dyn ProgressSink,
) -> BatchReport {
    let progress = BatchProgress::new(jobs.len());
    let mut report = BatchReport {
        total: jobs.len(),
        ..BatchReport::default()
    };
    sink.begin(report.total);
    if jobs.is_empty() {
        sink.finish(&report);
        return report;
    }

    tracing::info!(frames = report.total, strategy = strategy.name(), "starting batch download");

    let fetch = |job: &DownloadJob| {
        run_with_retry(retry, &job.frame.filename, || fetcher.fetch(&job.frame, &job.dest))
    };

    strategy.run(jobs, &fetch, &mut |job: DownloadJob, result: JobResult| {
        let completed = progress.record();
        let ok = result.is_ok();
        match result {
            Ok(bytes) => {
                tracing::debug!(file = %job.dest.display(), bytes, "frame saved");
                report.saved += 1;
                report.bytes += bytes;
            }
            Err(e) => {
                tracing::warn!(file = %job.frame.filename, "frame failed: {}", e);
                report.failures.push(FrameFailure {
                    file_name: job.frame.filename.clone(),
                    error: e.to_string(),
                });
            }
        }
        sink.advance(&ProgressUpdate {
            completed,
            total: progress.total(),
            file_name: &job.frame.filename,
            ok,
        });
    });

    sink.finish(&report);
    tracing::info!(
        saved = report.saved,
        failed = report.failures.len(),
        bytes = report.bytes,
        "batch download finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn frame(id: u64) -> Frame {
        Frame {
            id,
            filename: format!("frame-{:03}.fits.fz", id),
            url: format!("http://archive.test/{}", id),
            filter: "V".into(),
            reduction_level: 91,
            basename: format!("frame-{:03}", id),
            target_name: String::new(),
            site_id: String::new(),
            telescope_id: String::new(),
            instrument_id: String::new(),
            observation_date: None,
        }
    }

    /// Writes `content-<id>` to disk; fails with HTTP 404 for ids in `failing`.
    struct FakeFetcher {
        calls: AtomicUsize,
        failing: HashSet<u64>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeFetcher {
        fn new(failing: &[u64]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing: failing.iter().copied().collect(),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    impl FrameFetcher for FakeFetcher {
        fn fetch(&self, frame: &Frame, dest: &Path) -> Result<u64, TransferError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.failing.contains(&frame.id) {
                return Err(TransferError::Http(404));
            }
            let body = format!("content-{}", frame.id);
            std::fs::write(dest, &body)?;
            Ok(body.len() as u64)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        begun: Option<usize>,
        completed: Vec<usize>,
        finished: bool,
    }

    impl ProgressSink for RecordingSink {
        fn begin(&mut self, total: usize) {
            self.begun = Some(total);
        }
        fn advance(&mut self, update: &ProgressUpdate<'_>) {
            self.completed.push(update.completed);
        }
        fn finish(&mut self, _report: &BatchReport) {
            self.finished = true;
        }
    }

    fn run(
        fetcher: &FakeFetcher,
        ids: &[u64],
        streams: usize,
        dir: &Path,
    ) -> (BatchReport, RecordingSink) {
        let frames: Vec<Frame> = ids.iter().map(|id| frame(*id)).collect();
        let jobs = plan_jobs(&frames, dir);
        let strategy = select_strategy(streams);
        let mut sink = RecordingSink::default();
        let retry = RetryPolicy::no_retry();
        let report = download_batch(fetcher, jobs, strategy.as_ref(), &retry, &mut sink);
        (report, sink)
    }

    #[test]
    fn empty_selection_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[]);
        let (report, sink) = run(&fetcher, &[], 6, dir.path());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.total, 0);
        assert_eq!(report.saved, 0);
        assert_eq!(sink.begun, Some(0));
        assert!(sink.finished);
    }

    #[test]
    fn pooled_download_saves_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[]);
        let ids: Vec<u64> = (1..=12).collect();
        let (report, sink) = run(&fetcher, &ids, 4, dir.path());
        assert!(report.all_saved());
        assert_eq!(report.saved, 12);
        for id in ids {
            let path = dir.path().join(format!("frame-{:03}.fits.fz", id));
            let content = std::fs::read_to_string(path).unwrap();
            assert_eq!(content, format!("content-{}", id));
        }
        assert_eq!(sink.completed, (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn pool_never_exceeds_stream_count() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[]);
        let ids: Vec<u64> = (1..=20).collect();
        run(&fetcher, &ids, 3, dir.path());
        assert!(fetcher.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn single_stream_is_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[]);
        let (report, _) = run(&fetcher, &[1, 2, 3, 4], 1, dir.path());
        assert_eq!(report.saved, 4);
        assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn one_failure_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[3]);
        let ids: Vec<u64> = (1..=6).collect();
        let (report, sink) = run(&fetcher, &ids, 2, dir.path());
        assert_eq!(report.saved, 5);
        assert_eq!(
            report.failures,
            [FrameFailure {
                file_name: "frame-003.fits.fz".into(),
                error: "HTTP 404".into(),
            }]
        );
        assert!(!dir.path().join("frame-003.fits.fz").exists());
        assert_eq!(sink.completed.len(), 6);
    }

    #[test]
    fn rerun_overwrites_identically() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[]);
        run(&fetcher, &[1, 2], 2, dir.path());
        let first = std::fs::read(dir.path().join("frame-001.fits.fz")).unwrap();
        run(&fetcher, &[1, 2], 2, dir.path());
        let second = std::fs::read(dir.path().join("frame-001.fits.fz")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn server_names_cannot_escape_the_directory() {
        let mut f = frame(7);
        f.filename = "../../etc/passwd".into();
        assert_eq!(local_file_name(&f), "passwd");
        f.filename = "..".into();
        assert_eq!(local_file_name(&f), "frame-7");
    }
}

//! Progress reporting: frames finished in a batch, and bytes of one large
//! transfer (zip packages).
//!
//! The frame counter is bumped once per finished transfer on the collecting
//! thread, so the "i of n" values a sink sees are strictly increasing and end at n.

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::BatchReport;

/// Completed/total counter shared by a batch.
#[derive(Debug)]
pub struct BatchProgress {
    completed: AtomicUsize,
    total: usize,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            completed: AtomicUsize::new(0),
            total,
        }
    }

    /// Count one finished transfer and return the new completed count.
    pub fn record(&self) -> usize {
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

/// One finished transfer, as seen by a sink.
#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate<'a> {
    pub completed: usize,
    pub total: usize,
    pub file_name: &'a str,
    pub ok: bool,
}

pub trait ProgressSink {
    fn begin(&mut self, _total: usize) {}

    fn advance(&mut self, update: &ProgressUpdate<'_>);

    fn finish(&mut self, _report: &BatchReport) {}
}

/// One line per frame: `3 of 12: Frame x.fits.fz done.`
pub struct LineProgress<W: Write> {
    out: W,
}

impl<W: Write> LineProgress<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressSink for LineProgress<W> {
    fn advance(&mut self, update: &ProgressUpdate<'_>) {
        let outcome = if update.ok { "done" } else { "failed" };
        // Best effort: a closed pipe must not abort the batch.
        let _ = writeln!(
            self.out,
            "{} of {}: Frame {} {}.",
            update.completed, update.total, update.file_name, outcome
        );
    }
}

const BAR_WIDTH: usize = 30;

const MIB: f64 = 1_048_576.0;

fn bar(filled: usize) -> String {
    format!("[{}{}]", "=".repeat(filled), " ".repeat(BAR_WIDTH - filled))
}

/// Single redrawn line for interactive terminals: `[=========     ] 7/12 frames`.
pub struct BarProgress<W: Write> {
    out: W,
    failed: usize,
}

impl<W: Write> BarProgress<W> {
    pub fn new(out: W) -> Self {
        Self { out, failed: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, completed: usize, total: usize) {
        let filled = if total == 0 {
            BAR_WIDTH
        } else {
            (completed * BAR_WIDTH / total).min(BAR_WIDTH)
        };
        let failed = if self.failed > 0 {
            format!(" ({} failed)", self.failed)
        } else {
            String::new()
        };
        let _ = write!(self.out, "\r{} {}/{} frames{}", bar(filled), completed, total, failed);
        let _ = self.out.flush();
    }
}

impl<W: Write> ProgressSink for BarProgress<W> {
    fn begin(&mut self, total: usize) {
        if total > 0 {
            self.draw(0, total);
        }
    }

    fn advance(&mut self, update: &ProgressUpdate<'_>) {
        if !update.ok {
            self.failed += 1;
        }
        self.draw(update.completed, update.total);
    }

    fn finish(&mut self, report: &BatchReport) {
        if report.total > 0 {
            let _ = writeln!(self.out);
        }
    }
}

/// Bar on stderr for terminals, plain lines on stdout otherwise.
pub fn select_progress_sink(is_terminal: bool) -> Box<dyn ProgressSink> {
    if is_terminal {
        Box::new(BarProgress::new(io::stderr()))
    } else {
        Box::new(LineProgress::new(io::stdout()))
    }
}

/// Bytes written by a single streamed transfer.
pub trait ByteProgressSink {
    /// Called once the body starts arriving; `total` is the Content-Length, if sent.
    fn start(&mut self, _total: Option<u64>) {}

    /// `done` is the running byte count.
    fn update(&mut self, done: u64);

    fn finish(&mut self, _bytes: u64) {}
}

/// Redrawn `[=====     ] 12.0/48.0 MiB` line, refreshed once per MiB.
pub struct ByteBar<W: Write> {
    out: W,
    total: Option<u64>,
    last_mib: Option<u64>,
}

impl<W: Write> ByteBar<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            total: None,
            last_mib: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, done: u64) {
        let _ = match self.total {
            Some(total) if total > 0 => {
                let filled = ((done.min(total) * BAR_WIDTH as u64) / total) as usize;
                write!(
                    self.out,
                    "\r{} {:.1}/{:.1} MiB",
                    bar(filled),
                    done as f64 / MIB,
                    total as f64 / MIB
                )
            }
            _ => write!(self.out, "\r{:.1} MiB", done as f64 / MIB),
        };
        let _ = self.out.flush();
    }
}

impl<W: Write> ByteProgressSink for ByteBar<W> {
    fn start(&mut self, total: Option<u64>) {
        self.total = total;
        self.last_mib = Some(0);
        self.draw(0);
    }

    fn update(&mut self, done: u64) {
        let mib = done >> 20;
        if self.last_mib != Some(mib) || self.total == Some(done) {
            self.last_mib = Some(mib);
            self.draw(done);
        }
    }

    fn finish(&mut self, bytes: u64) {
        self.draw(bytes);
        let _ = writeln!(self.out);
    }
}

/// Size up front, then `10%...20%...` on one line, for logs and pipes.
pub struct ByteSteps<W: Write> {
    out: W,
    total: Option<u64>,
    last_step: Option<u64>,
}

impl<W: Write> ByteSteps<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            total: None,
            last_step: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ByteProgressSink for ByteSteps<W> {
    fn start(&mut self, total: Option<u64>) {
        self.total = total;
        self.last_step = None;
        let _ = match total {
            Some(t) => writeln!(self.out, "Package size {:.1} MiB.", t as f64 / MIB),
            None => writeln!(self.out, "Package size unknown."),
        };
    }

    fn update(&mut self, done: u64) {
        let Some(total) = self.total.filter(|t| *t > 0) else {
            return;
        };
        let step = (done.min(total) * 100 / total) / 10 * 10;
        if self.last_step.map_or(true, |last| step > last) {
            self.last_step = Some(step);
            let _ = write!(self.out, "{}%...", step);
            let _ = self.out.flush();
        }
    }

    fn finish(&mut self, _bytes: u64) {
        if self.last_step.is_some() {
            let _ = writeln!(self.out);
        }
    }
}

/// Byte bar on stderr for terminals, percentage steps on stdout otherwise.
pub fn select_byte_progress(is_terminal: bool) -> Box<dyn ByteProgressSink> {
    if is_terminal {
        Box::new(ByteBar::new(io::stderr()))
    } else {
        Box::new(ByteSteps::new(io::stdout()))
    }
}

//! Scheduling of frame transfers: one at a time, or a bounded pool of worker threads.

use std::collections::VecDeque;
use std::sync::{mpsc, Mutex};
use std::thread;

use super::{DownloadJob, JobResult};

/// Runs `fetch` for each job and hands every result to `on_done` on the calling thread.
pub trait FetchStrategy {
    fn name(&self) -> &'static str;

    fn run(
        &self,
        jobs: Vec<DownloadJob>,
        fetch: &(dyn Fn(&DownloadJob) -> JobResult + Sync),
        on_done: &mut dyn FnMut(DownloadJob, JobResult),
    );
}

/// Strictly sequential transfers, in job order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl FetchStrategy for Sequential {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn run(
        &self,
        jobs: Vec<DownloadJob>,
        fetch: &(dyn Fn(&DownloadJob) -> JobResult + Sync),
        on_done: &mut dyn FnMut(DownloadJob, JobResult),
    ) {
        for job in jobs {
            let res = fetch(&job);
            on_done(job, res);
        }
    }
}

/// At most `streams` transfers in flight. Workers pull from a shared queue and
/// report over a channel as they finish, so completion order is arbitrary.
#[derive(Debug, Clone, Copy)]
pub struct Pooled {
    pub streams: usize,
}

fn next_job(queue: &Mutex<VecDeque<DownloadJob>>) -> Option<DownloadJob> {
    queue.lock().ok().and_then(|mut q| q.pop_front())
}

impl FetchStrategy for Pooled {
    fn name(&self) -> &'static str {
        "pooled"
    }

    fn run(
        &self,
        jobs: Vec<DownloadJob>,
        fetch: &(dyn Fn(&DownloadJob) -> JobResult + Sync),
        on_done: &mut dyn FnMut(DownloadJob, JobResult),
    ) {
        let num_workers = self.streams.max(1).min(jobs.len());
        let queue = Mutex::new(VecDeque::from(jobs));
        let (tx, rx) = mpsc::channel::<(DownloadJob, JobResult)>();

        let spawned = thread::scope(|scope| {
            let mut spawned = 0usize;
            for i in 0..num_workers {
                let tx = tx.clone();
                let queue = &queue;
                let worker = thread::Builder::new()
                    .name(format!("lcodl-fetch-{}", i))
                    .spawn_scoped(scope, move || {
                        while let Some(job) = next_job(queue) {
                            let res = fetch(&job);
                            if tx.send((job, res)).is_err() {
                                break;
                            }
                        }
                    });
                match worker {
                    Ok(_) => spawned += 1,
                    Err(e) => {
                        tracing::warn!("could not start fetch worker {}: {}", i, e);
                        break;
                    }
                }
            }
            // Only worker clones keep the channel open; iteration ends when they all exit.
            drop(tx);
            for (job, res) in rx.iter() {
                on_done(job, res);
            }
            spawned
        });

        if spawned == 0 && num_workers > 0 {
            tracing::warn!("no fetch workers available; falling back to sequential transfers");
        }
        // Leftovers exist only if no worker could be started.
        while let Some(job) = next_job(&queue) {
            let res = fetch(&job);
            on_done(job, res);
        }
    }
}

/// `Sequential` for one stream, otherwise a pool of `streams` workers.
pub fn select_strategy(streams: usize) -> Box<dyn FetchStrategy> {
    if streams <= 1 {
        Box::new(Sequential)
    } else {
        Box::new(Pooled { streams })
    }
}

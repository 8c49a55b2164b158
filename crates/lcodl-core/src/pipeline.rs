//! One run against a request: portal info, listing, selection, plan, then
//! counts only, zip packages or individual frames.
//!
//! Nothing here prints. The caller sees each step through a `RunObserver` and
//! gets a `RunOutcome` back.

use std::path::PathBuf;

use crate::archive::{ArchiveClient, RequestInfo};
use crate::batch::{download_batch, select_strategy, BatchReport, ByteProgressSink, ProgressSink};
use crate::error::LcoError;
use crate::options::Options;
use crate::plan::{DownloadPlan, FilterGroup};
use crate::retry::RetryPolicy;
use crate::select::select;

/// What the portal said about the request.
#[derive(Debug, Clone)]
pub enum RequestLookup {
    Found(RequestInfo),
    /// Not fatal; the message is the error that was swallowed.
    Unavailable(String),
}

impl RequestLookup {
    pub fn info(&self) -> Option<&RequestInfo> {
        match self {
            RequestLookup::Found(info) => Some(info),
            RequestLookup::Unavailable(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedZip {
    pub filter: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// How the run ended after planning.
#[derive(Debug, Clone)]
pub enum Transfers {
    NothingSelected,
    CountOnly,
    Frames(BatchReport),
    Zips(Vec<SavedZip>),
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub lookup: RequestLookup,
    /// Frames listed for the request, before selection.
    pub listed: usize,
    pub plan: DownloadPlan,
    pub transfers: Transfers,
}

/// Hooks called as the run advances. Only the two progress sinks are required.
pub trait RunObserver {
    fn request_looked_up(&mut self, _request_id: &str, _lookup: &RequestLookup) {}

    fn planned(&mut self, _opts: &Options, _plan: &DownloadPlan) {}

    fn frames_starting(&mut self, _opts: &Options, _plan: &DownloadPlan) {}

    fn frames_done(&mut self, _report: &BatchReport) {}

    fn zip_starting(&mut self, _group: &FilterGroup) {}

    fn zip_saved(&mut self, _zip: &SavedZip) {}

    fn frame_progress(&mut self) -> &mut dyn ProgressSink;

    fn byte_progress(&mut self) -> &mut dyn ByteProgressSink;
}

/// Auth and unknown-request errors end the run; anything else is reported and skipped.
fn look_up(client: &ArchiveClient, request_id: &str) -> Result<RequestLookup, LcoError> {
    match client.request_info(request_id) {
        Ok(info) => Ok(RequestLookup::Found(info)),
        Err(e @ (LcoError::Auth(_) | LcoError::NotFound(_))) => Err(e),
        Err(e) => {
            tracing::warn!(request_id, "request info unavailable: {}", e);
            Ok(RequestLookup::Unavailable(e.to_string()))
        }
    }
}

/// Run `opts` against the archive. Per-frame failures land in the report;
/// a failed zip package stops the run with `LcoError::ZipPackage`.
pub fn run_request(
    client: &ArchiveClient,
    opts: &Options,
    retry: &RetryPolicy,
    observer: &mut dyn RunObserver,
) -> Result<RunOutcome, LcoError> {
    let lookup = look_up(client, &opts.request_id)?;
    observer.request_looked_up(&opts.request_id, &lookup);
    if let (Some(filter), Some(info)) = (opts.filter.as_deref(), lookup.info()) {
        if !info.has_filter(filter) {
            return Err(LcoError::FilterNotInRequest {
                filter: filter.to_string(),
                request_id: opts.request_id.clone(),
            });
        }
    }

    let frames = client.list_frames(&opts.request_id)?;
    let selected = select(&frames, &opts.criteria());
    tracing::info!(listed = frames.len(), selected = selected.len(), "selection done");

    let plan = DownloadPlan::build(opts, &selected, lookup.info());
    observer.planned(opts, &plan);

    let transfers = if plan.groups.is_empty() {
        Transfers::NothingSelected
    } else if opts.count_only {
        Transfers::CountOnly
    } else {
        plan.create_dirs(opts.zipfile)?;
        if opts.zipfile {
            Transfers::Zips(fetch_zips(client, &plan, observer)?)
        } else {
            observer.frames_starting(opts, &plan);
            let jobs = plan.groups.iter().flat_map(|g| g.jobs()).collect();
            let strategy = select_strategy(opts.streams);
            let report =
                download_batch(client, jobs, strategy.as_ref(), retry, observer.frame_progress());
            observer.frames_done(&report);
            Transfers::Frames(report)
        }
    };

    Ok(RunOutcome {
        lookup,
        listed: frames.len(),
        plan,
        transfers,
    })
}

fn fetch_zips(
    client: &ArchiveClient,
    plan: &DownloadPlan,
    observer: &mut dyn RunObserver,
) -> Result<Vec<SavedZip>, LcoError> {
    let mut saved = Vec::with_capacity(plan.groups.len());
    for group in &plan.groups {
        observer.zip_starting(group);
        let bytes = client
            .download_zip(&group.frames, &group.zip_path, observer.byte_progress())
            .map_err(|e| LcoError::ZipPackage {
                filter: group.filter.clone(),
                path: group.zip_path.clone(),
                source: Box::new(e),
            })?;
        let zip = SavedZip {
            filter: group.filter.clone(),
            path: group.zip_path.clone(),
            bytes,
        };
        observer.zip_saved(&zip);
        saved.push(zip);
    }
    Ok(saved)
}

//! Where the selected frames go: one group per filter, each with a target
//! directory and a zip path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::{Frame, RequestInfo};
use crate::batch::{plan_jobs, DownloadJob};
use crate::error::LcoError;
use crate::naming;
use crate::options::Options;
use crate::select::filters_in_order;

/// Date used in organized names when neither the request nor the frames carry one.
const UNKNOWN_DATE: &str = "00000000";

#[derive(Debug, Clone)]
pub struct FilterGroup {
    pub filter: String,
    pub frames: Vec<Frame>,
    /// Directory the frames are written to.
    pub dir: PathBuf,
    /// Package path in zip mode.
    pub zip_path: PathBuf,
}

impl FilterGroup {
    pub fn jobs(&self) -> Vec<DownloadJob> {
        plan_jobs(&self.frames, &self.dir)
    }
}

#[derive(Debug, Clone)]
pub struct DownloadPlan {
    /// Top-level output directory (the observation directory when organized).
    pub root: PathBuf,
    pub groups: Vec<FilterGroup>,
}

fn night(info: Option<&RequestInfo>, first: &Frame) -> String {
    info.and_then(RequestInfo::compact_date)
        .or_else(|| naming::frame_date(first))
        .unwrap_or_else(|| UNKNOWN_DATE.to_string())
}

impl DownloadPlan {
    /// Group `selected` by filter in order of first appearance.
    pub fn build(opts: &Options, selected: &[Frame], info: Option<&RequestInfo>) -> DownloadPlan {
        let filters = filters_in_order(selected);
        let grouped: Vec<(String, Vec<Frame>)> = filters
            .into_iter()
            .map(|filter| {
                let frames = selected.iter().filter(|f| f.filter == filter).cloned().collect();
                (filter, frames)
            })
            .collect();

        let Some(first) = selected.first().filter(|_| opts.organize) else {
            let root = opts.directory.clone();
            let groups = grouped
                .into_iter()
                .map(|(filter, frames)| FilterGroup {
                    zip_path: root.join(format!("{}_{}.zip", opts.request_id, filter)),
                    dir: root.clone(),
                    filter,
                    frames,
                })
                .collect();
            return DownloadPlan { root, groups };
        };

        let date = night(info, first);
        let filter_names: Vec<String> = grouped.iter().map(|(f, _)| f.clone()).collect();
        let root = opts.directory.join(format!(
            "{}_{}",
            naming::observation_stem(first, &filter_names, &date),
            selected.len()
        ));
        let groups = grouped
            .into_iter()
            .map(|(filter, frames)| {
                let stem = format!(
                    "{}_{}",
                    naming::filter_stem(
                        &frames[0],
                        &filter,
                        &date,
                        info.and_then(|i| i.exposure_for(&filter)),
                        info.and_then(|i| i.defocus),
                    ),
                    frames.len()
                );
                FilterGroup {
                    dir: root.join(&stem),
                    zip_path: root.join(format!("{}.zip", stem)),
                    filter,
                    frames,
                }
            })
            .collect();
        DownloadPlan { root, groups }
    }

    pub fn total_frames(&self) -> usize {
        self.groups.iter().map(|g| g.frames.len()).sum()
    }

    /// Create the directories the run writes into: just the root for zips,
    /// every group directory otherwise.
    pub fn create_dirs(&self, zipfile: bool) -> Result<(), LcoError> {
        create_dir(&self.root)?;
        if !zipfile {
            for group in &self.groups {
                create_dir(&group.dir)?;
            }
        }
        Ok(())
    }
}

fn create_dir(dir: &Path) -> Result<(), LcoError> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| LcoError::filesystem(dir, e))?;
    tracing::info!(dir = %dir.display(), "created output directory");
    Ok(())
}

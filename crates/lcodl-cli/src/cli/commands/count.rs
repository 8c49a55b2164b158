use lcodl_core::options::Options;
use lcodl_core::plan::DownloadPlan;

pub fn print_counts(opts: &Options, plan: &DownloadPlan) {
    if plan.groups.is_empty() {
        println!("No frames match the query; check parameters and try again.");
        return;
    }
    for group in &plan.groups {
        println!(
            "Request ID {} has {} frames in filter {}.",
            opts.request_id,
            group.frames.len(),
            group.filter
        );
    }
    if plan.groups.len() > 1 {
        println!("{} frames in total.", plan.total_frames());
    }
}

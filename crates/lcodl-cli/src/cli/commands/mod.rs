//! CLI output, one file per step of the run.

mod console;
mod count;
mod download;
mod info;
mod zip;

pub use console::Console;
pub use count::print_counts;
pub use download::{print_download_start, print_download_summary};
pub use info::print_request_info;
pub use zip::{print_zip_saved, print_zip_start};

use lcodl_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    // Log file first; stderr if the state directory is unusable.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    if let Err(err) = Cli::run_from_args().await {
        eprintln!("lcodl error: {:#}", err);
        std::process::exit(1);
    }
}

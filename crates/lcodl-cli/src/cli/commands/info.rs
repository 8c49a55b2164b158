//! Observation-portal summary printed before the listing.

use lcodl_core::pipeline::RequestLookup;

/// Print the request's start date and filters, or a notice when the portal
/// could not be read.
pub fn print_request_info(request_id: &str, lookup: &RequestLookup) {
    let info = match lookup {
        RequestLookup::Found(info) => info,
        RequestLookup::Unavailable(_) => {
            println!("*** Could not fetch information for request ID {}.\n", request_id);
            return;
        }
    };
    match info.start_date.as_deref() {
        Some(date) => println!("Observations starting {}:", date),
        None => println!("Observations for request {}:", request_id),
    }
    for f in &info.filters {
        println!("\tFilter {}, {:.0}-second exposures.", f.filter, f.exposure_secs);
    }
    println!();
}

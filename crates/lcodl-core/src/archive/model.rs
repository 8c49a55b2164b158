//! Wire types of the archive `/frames/` listing.

use serde::{Deserialize, Serialize};

/// `reduction_level` of raw sensor frames.
pub const RAW_LEVEL: u8 = 0;
/// `reduction_level` of frames processed by the archive pipeline.
pub const REDUCED_LEVEL: u8 = 91;

/// One downloadable file belonging to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub id: u64,
    /// File name the archive wants the frame saved as.
    pub filename: String,
    /// Pre-signed download URL; fetched without the API token.
    pub url: String,
    #[serde(rename = "primary_optical_element", default)]
    pub filter: String,
    #[serde(default)]
    pub reduction_level: u8,
    #[serde(default)]
    pub basename: String,
    #[serde(default)]
    pub target_name: String,
    #[serde(default)]
    pub site_id: String,
    #[serde(default)]
    pub telescope_id: String,
    #[serde(default)]
    pub instrument_id: String,
    /// e.g. `2022-09-19T06:41:12.123000Z`
    #[serde(default)]
    pub observation_date: Option<String>,
}

impl Frame {
    pub fn is_raw(&self) -> bool {
        self.reduction_level == RAW_LEVEL
    }

    /// Sort key: the basename encodes site, camera, night and frame number.
    pub fn sort_key(&self) -> &str {
        if self.basename.is_empty() {
            &self.filename
        } else {
            &self.basename
        }
    }
}

/// One page of `/frames/?request_id=...`.
#[derive(Debug, Clone, Deserialize)]
pub struct FramePage {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub results: Vec<Frame>,
}

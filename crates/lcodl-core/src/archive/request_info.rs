//! Observation-portal request record: start date, filters, exposure times, defocus.

use serde::Deserialize;
use std::collections::HashMap;

/// MuSCAT cameras expose all four bands at once with per-band exposure times.
const MUSCAT_INSTRUMENT: &str = "2M0-SCICAM-MUSCAT";
const MUSCAT_BANDS: [(&str, &str); 4] = [
    ("gp", "exposure_time_g"),
    ("rp", "exposure_time_r"),
    ("ip", "exposure_time_i"),
    ("zs", "exposure_time_z"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct FilterExposure {
    pub filter: String,
    pub exposure_secs: f64,
}

/// What the portal says about a request, reduced to what the downloader prints and names.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestInfo {
    /// `YYYY-MM-DD` of the first scheduling window.
    pub start_date: Option<String>,
    pub instrument_type: String,
    pub filters: Vec<FilterExposure>,
    pub defocus: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RequestRecord {
    #[serde(default)]
    windows: Vec<Window>,
    #[serde(default)]
    configurations: Vec<Configuration>,
}

#[derive(Debug, Deserialize)]
struct Window {
    start: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Configuration {
    #[serde(default)]
    instrument_type: String,
    #[serde(default)]
    instrument_configs: Vec<InstrumentConfig>,
}

#[derive(Debug, Deserialize)]
struct InstrumentConfig {
    #[serde(default)]
    exposure_time: f64,
    #[serde(default)]
    optical_elements: HashMap<String, serde_json::Value>,
    #[serde(default)]
    extra_params: HashMap<String, serde_json::Value>,
}

impl RequestInfo {
    pub(crate) fn from_record(record: RequestRecord) -> Self {
        let start_date = record
            .windows
            .first()
            .and_then(|w| w.start.as_deref())
            .map(|s| s.split('T').next().unwrap_or(s).to_string());

        let Some(config) = record.configurations.into_iter().next() else {
            return Self {
                start_date,
                instrument_type: String::new(),
                filters: Vec::new(),
                defocus: None,
            };
        };

        let first_params = config.instrument_configs.first().map(|c| &c.extra_params);
        // Older requests carry no defocus key at all.
        let defocus = first_params
            .and_then(|p| p.get("defocus"))
            .and_then(|v| v.as_f64());

        let filters = if config.instrument_type == MUSCAT_INSTRUMENT {
            MUSCAT_BANDS
                .iter()
                .map(|(band, key)| FilterExposure {
                    filter: band.to_string(),
                    exposure_secs: first_params
                        .and_then(|p| p.get(*key))
                        .and_then(|v| v.as_f64())
                        .unwrap_or(0.0),
                })
                .collect()
        } else {
            config
                .instrument_configs
                .iter()
                .filter_map(|c| {
                    c.optical_elements
                        .get("filter")
                        .and_then(|v| v.as_str())
                        .map(|f| FilterExposure {
                            filter: f.to_string(),
                            exposure_secs: c.exposure_time,
                        })
                })
                .collect()
        };

        Self {
            start_date,
            instrument_type: config.instrument_type,
            filters,
            defocus,
        }
    }

    /// Start date without dashes (`20220919`), as used in directory names.
    pub fn compact_date(&self) -> Option<String> {
        self.start_date.as_ref().map(|d| d.replace('-', ""))
    }

    pub fn has_filter(&self, filter: &str) -> bool {
        self.filters.iter().any(|f| f.filter == filter)
    }

    pub fn exposure_for(&self, filter: &str) -> Option<f64> {
        self.filters
            .iter()
            .find(|f| f.filter == filter)
            .map(|f| f.exposure_secs)
    }
}

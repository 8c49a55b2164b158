//! Directory and zip names for the organized layout (`--organize`).
//!
//! Names encode target, night, site, telescope and filters, e.g.
//! `TIC359388309-01_20220919_LCO-SAAO-1m0_V_30s_2f0_12`.

use crate::archive::Frame;

/// Site codes to the observatory names astronomers use.
const SITE_NAMES: [(&str, &str); 6] = [
    ("coj", "SSO"),
    ("cpt", "SAAO"),
    ("tfn", "Teid"),
    ("lsc", "CTIO"),
    ("elp", "McD"),
    ("ogg", "Hal"),
];

/// `TIC 359388309.01 (TOI 4172.01)` -> `TIC359388309-01`
///
/// Spaces go first, then everything from the first `(` to the last `)`.
/// Text after the last `)` is kept.
pub fn sanitize_target(target: &str) -> String {
    let mut name: String = target.chars().filter(|c| *c != ' ').collect();
    if let Some(open) = name.find('(') {
        if let Some(close) = name.rfind(')').filter(|close| *close > open) {
            name.replace_range(open..=close, "");
        }
    }
    name.replace('.', "-")
}

pub fn site_name(site_id: &str) -> String {
    SITE_NAMES
        .iter()
        .find(|(code, _)| *code == site_id)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| site_id.to_uppercase())
}

/// `M3` for the MuSCAT (`ep*`) cameras, else the telescope id without its
/// unit letter (`1m0a` -> `1m0`).
pub fn telescope_name(frame: &Frame) -> String {
    if frame.instrument_id.starts_with("ep") {
        return "M3".to_string();
    }
    let t = frame.telescope_id.as_str();
    match t.chars().last() {
        Some(c) if c.is_ascii_lowercase() => t[..t.len() - 1].to_string(),
        _ => t.to_string(),
    }
}

/// `2.0` -> `2f0`, `-1.5` -> `-1f5`
pub fn defocus_tag(defocus: f64) -> String {
    format!("{:.1}", defocus).replace('.', "f")
}

/// Night of observation as `YYYYMMDD`, taken from the frame when the request record is unavailable.
pub fn frame_date(frame: &Frame) -> Option<String> {
    let date = frame.observation_date.as_deref()?.split('T').next()?;
    let compact = date.replace('-', "");
    (compact.len() == 8 && compact.chars().all(|c| c.is_ascii_digit())).then_some(compact)
}

/// Shared stem: `{target}_{date}_LCO-{site}-{telescope}_{filters}`.
pub fn observation_stem(frame: &Frame, filters: &[String], date: &str) -> String {
    format!(
        "{}_{}_LCO-{}-{}_{}",
        sanitize_target(&frame.target_name),
        date,
        site_name(&frame.site_id),
        telescope_name(frame),
        filters.join("_")
    )
}

/// Per-filter name: the stem for one filter plus optional exposure and defocus tags.
pub fn filter_stem(
    frame: &Frame,
    filter: &str,
    date: &str,
    exposure_secs: Option<f64>,
    defocus: Option<f64>,
) -> String {
    let mut s = observation_stem(frame, &[filter.to_string()], date);
    if let Some(exp) = exposure_secs {
        s.push_str(&format!("_{}s", exp as i64));
    }
    if let Some(d) = defocus {
        s.push('_');
        s.push_str(&defocus_tag(d));
    }
    s
}

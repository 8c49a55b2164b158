//! Frame files on disk: write to `<name>.part`, rename into place on success.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Temporary file suffix used before the final rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path
/// (e.g. `a.fits.fz` -> `a.fits.fz.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// A download in progress. Dropping it without `finalize` removes the temp file.
pub struct PartFile {
    writer: Option<BufWriter<File>>,
    temp_path: PathBuf,
    final_path: PathBuf,
    written: u64,
}

impl PartFile {
    /// Create (or truncate) the temp file for `final_path`.
    pub fn create(final_path: &Path) -> io::Result<Self> {
        let temp_path = temp_path(final_path);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        Ok(Self {
            writer: Some(BufWriter::new(file)),
            temp_path,
            final_path: final_path.to_path_buf(),
            written: 0,
        })
    }

    pub fn write_chunk(&mut self, data: &[u8]) -> io::Result<()> {
        if let Some(w) = self.writer.as_mut() {
            w.write_all(data)?;
            self.written += data.len() as u64;
        }
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Flush and rename over `final_path`, replacing any existing file. Returns bytes written.
    pub fn finalize(mut self) -> io::Result<u64> {
        if let Some(w) = self.writer.take() {
            let file = w.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        std::fs::rename(&self.temp_path, &self.final_path)?;
        Ok(self.written)
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}

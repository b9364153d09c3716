use std::fmt;
use std::fs;
use std::str::FromStr;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use regex::Regex;
use serde::Serialize;

use crate::error::PipelineError;

pub const DEFAULT_RUN_NAME: &str = "mymlst";
pub const DEFAULT_THREADS: &str = "8";
pub const FASTQ_EXTS: &[&str] = &["fastq", "fq"];

static THREADS_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+$").unwrap());

/// Number of threads handed to every external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ThreadCount(u32);

impl ThreadCount {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for ThreadCount {
    fn default() -> Self {
        Self(8)
    }
}

impl fmt::Display for ThreadCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ThreadCount {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            PipelineError::InvalidInput(format!(
                "thread count must be a positive integer, got {value:?}"
            ))
        };
        if !THREADS_PATTERN.is_match(value) {
            return Err(invalid());
        }
        match value.parse::<u32>() {
            Ok(0) | Err(_) => Err(invalid()),
            Ok(count) => Ok(Self(count)),
        }
    }
}

/// One forward/reverse read pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub index: usize,
    pub forward: Utf8PathBuf,
    pub reverse: Utf8PathBuf,
    pub derived_name: String,
}

impl Sample {
    pub fn new(
        index: usize,
        forward: Utf8PathBuf,
        reverse: Utf8PathBuf,
    ) -> Result<Self, PipelineError> {
        if forward == reverse {
            return Err(PipelineError::InvalidInput(format!(
                "sample {index} pairs {forward} with itself"
            )));
        }
        let file_name = reverse
            .file_name()
            .ok_or_else(|| PipelineError::InvalidInput(format!("not a file path: {reverse}")))?;
        let derived_name = derive_sample_name(file_name);
        if derived_name.is_empty() {
            return Err(PipelineError::InvalidInput(format!(
                "cannot derive a sample name from {file_name}"
            )));
        }
        Ok(Self {
            index,
            forward,
            reverse,
            derived_name,
        })
    }
}

/// Strips a trailing `.gz` and then one format suffix from a file name.
///
/// `reads_R2.fastq.gz` becomes `reads_R2`, `reads_R2.fq` becomes `reads_R2`.
pub fn derive_sample_name(file_name: &str) -> String {
    let name = strip_suffix_ignore_case(file_name, ".gz").unwrap_or(file_name);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}

/// Extension that decides whether a file counts as FASTQ.
///
/// For gzipped content the compression suffix is dropped first, whatever it is.
pub fn effective_extension(file_name: &str, gzipped: bool) -> Option<String> {
    let path = Utf8Path::new(file_name);
    let path = if gzipped { Utf8Path::new(path.file_stem()?) } else { path };
    path.extension().map(|ext| ext.to_ascii_lowercase())
}

pub fn is_fastq_extension(ext: &str) -> bool {
    FASTQ_EXTS.iter().any(|known| ext.eq_ignore_ascii_case(known))
}

/// True when the file content starts with a valid gzip header.
pub fn is_gzipped(path: &Utf8Path) -> Result<bool, PipelineError> {
    let file = fs::File::open(path.as_std_path())
        .map_err(|err| PipelineError::Filesystem(format!("open {path}: {err}")))?;
    Ok(GzDecoder::new(file).header().is_some())
}

fn strip_suffix_ignore_case<'a>(value: &'a str, suffix: &str) -> Option<&'a str> {
    let split = value.len().checked_sub(suffix.len())?;
    if !value.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = value.split_at(split);
    (tail.eq_ignore_ascii_case(suffix) && !head.is_empty()).then_some(head)
}

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::domain::{DEFAULT_RUN_NAME, DEFAULT_THREADS, ThreadCount};
use crate::error::PipelineError;
use crate::validate;

/// Options exactly as the user typed them.
#[derive(Debug, Clone)]
pub struct RawOptions {
    pub fastq_folder: String,
    pub run_name: String,
    pub threads: String,
    pub conversion: bool,
    pub work_dir: Option<String>,
}

impl RawOptions {
    pub fn new(fastq_folder: impl Into<String>) -> Self {
        Self {
            fastq_folder: fastq_folder.into(),
            run_name: DEFAULT_RUN_NAME.to_string(),
            threads: DEFAULT_THREADS.to_string(),
            conversion: false,
            work_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    pub input_folder: Utf8PathBuf,
    pub run_name: String,
    pub threads: ThreadCount,
    pub convert_annotations: bool,
    pub work_dir: Utf8PathBuf,
}

impl PipelineConfig {
    pub fn resolve(raw: RawOptions) -> Result<Self, PipelineError> {
        let threads = validate::thread_count(&raw.threads)?;
        let run_name = resolve_run_name(&raw.run_name)?;

        let work_dir = match raw.work_dir {
            Some(dir) => Utf8PathBuf::from(dir),
            None => {
                let cwd = std::env::current_dir()
                    .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
                Utf8PathBuf::from_path_buf(cwd).map_err(|path| {
                    PipelineError::Filesystem(format!(
                        "working directory is not valid UTF-8: {}",
                        path.display()
                    ))
                })?
            }
        };

        Ok(Self {
            input_folder: Utf8PathBuf::from(raw.fastq_folder),
            run_name,
            threads,
            convert_annotations: raw.conversion,
            work_dir,
        })
    }
}

fn resolve_run_name(value: &str) -> Result<String, PipelineError> {
    let trimmed = value.trim();
    let is_valid = !trimmed.is_empty()
        && trimmed != "."
        && trimmed != ".."
        && !trimmed.contains(['/', '\\']);
    if !is_valid {
        return Err(PipelineError::InvalidInput(format!(
            "run name must be a plain directory name, got {value:?}"
        )));
    }
    Ok(trimmed.to_string())
}

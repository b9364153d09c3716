use std::fs;

use camino::Utf8Path;
use tracing::debug;

use crate::domain::{ThreadCount, effective_extension, is_fastq_extension, is_gzipped};
use crate::error::{PipelineError, fs_err};
use crate::workspace::Layout;

/// Parses the raw `-t` argument.
pub fn thread_count(raw: &str) -> Result<ThreadCount, PipelineError> {
    raw.parse()
}

/// Checks that `folder` is a directory holding only FASTQ files, plain or gzipped.
///
/// Returns the file names, unsorted. Nothing is written.
pub fn input_folder(folder: &Utf8Path) -> Result<Vec<String>, PipelineError> {
    let metadata = fs::metadata(folder.as_std_path())
        .map_err(|_| PipelineError::MissingInput(folder.to_path_buf()))?;
    if !metadata.is_dir() {
        return Err(PipelineError::MissingInput(folder.to_path_buf()));
    }

    let entries = folder
        .read_dir_utf8()
        .map_err(|err| PipelineError::Filesystem(format!("read {folder}: {err}")))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        let name = entry.file_name().to_string();
        let path = entry.path();
        if !path.is_file() {
            return Err(PipelineError::InvalidInput(format!(
                "{path} is not a FASTQ file"
            )));
        }
        fastq_file(path, &name)?;
        names.push(name);
    }
    Ok(names)
}

/// Rejects an input folder that is, or sits inside, a directory the run resets or removes.
pub fn outside_run_outputs(folder: &Utf8Path, layout: &Layout) -> Result<(), PipelineError> {
    let input = folder
        .canonicalize_utf8()
        .map_err(|err| fs_err(format!("resolve {folder}"), err))?;
    // A working root that does not exist yet cannot contain the input.
    let Ok(work_dir) = layout.work_dir().canonicalize_utf8() else {
        return Ok(());
    };
    let Ok(relative) = input.strip_prefix(&work_dir) else {
        return Ok(());
    };
    match relative.components().next() {
        Some(first) if layout.owns_dir_name(first.as_str()) => {
            Err(PipelineError::InvalidInput(format!(
                "input folder {folder} lies inside {}, which this run overwrites; \
                 move the reads or pick another -o run name",
                work_dir.join(first.as_str())
            )))
        }
        _ => Ok(()),
    }
}

fn fastq_file(path: &Utf8Path, name: &str) -> Result<(), PipelineError> {
    let gzipped = is_gzipped(path)?;
    let ext = effective_extension(name, gzipped);
    debug!(file = %path, gzipped, ext = ?ext, "checked input file");
    match ext {
        Some(ext) if is_fastq_extension(&ext) => Ok(()),
        _ => Err(PipelineError::InvalidInput(format!(
            "{path} is not a FASTQ file (expected .fastq or .fq, optionally gzipped)"
        ))),
    }
}

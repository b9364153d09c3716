use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::ThreadCount;
use crate::error::PipelineError;
use crate::tools::Tool;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_name: String,
    pub threads: ThreadCount,
    pub conversion: bool,
    pub tools: Vec<Tool>,
    pub started_at: String,
    pub finished_at: String,
    pub output_root: Utf8PathBuf,
    pub typing_report: Utf8PathBuf,
    pub typing_rows: usize,
    pub unpaired_file: Option<Utf8PathBuf>,
    pub samples: Vec<SampleEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleEntry {
    pub index: usize,
    pub name: String,
    pub forward: Utf8PathBuf,
    pub reverse: Utf8PathBuf,
    pub directory: Utf8PathBuf,
    pub converted_annotation: Option<Utf8PathBuf>,
}

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

/// Writes the summary as pretty JSON via a temporary sibling file.
pub fn write_manifest(path: &Utf8Path, summary: &RunSummary) -> Result<(), PipelineError> {
    let content = serde_json::to_vec_pretty(summary)
        .map_err(|err| PipelineError::Manifest(err.to_string()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(tmp_path.as_std_path(), &content)
        .map_err(|err| PipelineError::Manifest(format!("{tmp_path}: {err}")))?;
    fs::rename(tmp_path.as_std_path(), path.as_std_path())
        .map_err(|err| PipelineError::Manifest(format!("{path}: {err}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_is_pretty_json() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let summary = RunSummary {
            run_name: "run".to_string(),
            threads: "2".parse().unwrap(),
            conversion: false,
            tools: Tool::required(false),
            started_at: timestamp(Utc::now()),
            finished_at: timestamp(Utc::now()),
            output_root: root.join("run"),
            typing_report: root.join("run_mlst.tsv"),
            typing_rows: 0,
            unpaired_file: None,
            samples: Vec::new(),
        };
        let path = root.join("run.json");

        write_manifest(&path, &summary).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["threads"], 2);
        assert_eq!(value["tools"][0], "assembler");
        assert!(value["unpaired_file"].is_null());
        assert!(!root.join("run.json.tmp").exists());
    }
}

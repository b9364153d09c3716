use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::config::PipelineConfig;
use crate::domain::Sample;
use crate::error::{PipelineError, fs_err};

pub const CONTIGS_FILE: &str = "contigs.fasta";
pub const REFERENCE_ASSEMBLY_FILE: &str = "reference_assembly.fasta";
pub const ANNOTATION_PREFIX: &str = "prokka";
pub const ANNOTATION_FILE: &str = "prokka.gff";
pub const CONVERTED_ANNOTATION_FILE: &str = "prokka.gtf";
pub const STAGED_EXT: &str = "fasta";
pub const REPORT_SUFFIX: &str = "mlst.tsv";
pub const MANIFEST_FILE: &str = "run.json";

/// Every path the pipeline reads or writes, derived from the working root and run name.
#[derive(Debug, Clone)]
pub struct Layout {
    work_dir: Utf8PathBuf,
    run_name: String,
}

impl Layout {
    pub fn new(work_dir: impl Into<Utf8PathBuf>, run_name: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            run_name: run_name.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.work_dir.clone(), config.run_name.clone())
    }

    pub fn work_dir(&self) -> &Utf8Path {
        &self.work_dir
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn sample_dir(&self, sample: &Sample) -> Utf8PathBuf {
        self.work_dir
            .join(format!("{}_{}", self.run_name, sample.index))
    }

    pub fn assembly_dir(&self, sample: &Sample) -> Utf8PathBuf {
        self.sample_dir(sample).join("assembly")
    }

    pub fn contigs_path(&self, sample: &Sample) -> Utf8PathBuf {
        self.assembly_dir(sample).join(CONTIGS_FILE)
    }

    pub fn reference_assembly_path(&self, sample: &Sample) -> Utf8PathBuf {
        self.assembly_dir(sample).join(REFERENCE_ASSEMBLY_FILE)
    }

    pub fn annotation_dir(&self, sample: &Sample) -> Utf8PathBuf {
        self.sample_dir(sample).join("annotation")
    }

    pub fn staging_dir(&self) -> Utf8PathBuf {
        self.work_dir.join(format!("{}_staging", self.run_name))
    }

    pub fn staged_contigs_path(&self, sample: &Sample) -> Utf8PathBuf {
        self.staging_dir()
            .join(format!("{}.{STAGED_EXT}", sample.derived_name))
    }

    pub fn typing_report_path(&self) -> Utf8PathBuf {
        self.work_dir
            .join(format!("{}_{REPORT_SUFFIX}", self.run_name))
    }

    pub fn named_sample_dir_name(&self, sample: &Sample) -> String {
        format!("{}_{}", self.run_name, sample.derived_name)
    }

    pub fn output_root(&self) -> Utf8PathBuf {
        self.work_dir.join(&self.run_name)
    }

    pub fn final_sample_dir(&self, sample: &Sample) -> Utf8PathBuf {
        self.output_root().join(self.named_sample_dir_name(sample))
    }

    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.output_root().join(MANIFEST_FILE)
    }

    /// True for names of directories the run resets or removes directly under the working root:
    /// the output root, the staging directory and `{run}_{n}`.
    pub fn owns_dir_name(&self, name: &str) -> bool {
        if name == self.run_name || name == format!("{}_staging", self.run_name) {
            return true;
        }
        name.strip_prefix(self.run_name.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
    }
}

/// Removes `dir` if present and creates it empty.
pub fn reset_dir(dir: &Utf8Path) -> Result<(), PipelineError> {
    remove_dir(dir)?;
    fs::create_dir_all(dir.as_std_path()).map_err(|err| fs_err(format!("create {dir}"), err))?;
    debug!(dir = %dir, "reset directory");
    Ok(())
}

pub fn remove_dir(dir: &Utf8Path) -> Result<(), PipelineError> {
    if dir.as_std_path().exists() {
        fs::remove_dir_all(dir.as_std_path())
            .map_err(|err| fs_err(format!("remove {dir}"), err))?;
    }
    Ok(())
}

/// Renames a directory, replacing whatever sits at `to`.
pub fn replace_dir(from: &Utf8Path, to: &Utf8Path) -> Result<(), PipelineError> {
    remove_dir(to)?;
    fs::rename(from.as_std_path(), to.as_std_path())
        .map_err(|err| fs_err(format!("move {from} to {to}"), err))
}

pub fn copy_file(from: &Utf8Path, to: &Utf8Path) -> Result<(), PipelineError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| fs_err(format!("create {parent}"), err))?;
    }
    fs::copy(from.as_std_path(), to.as_std_path())
        .map_err(|err| fs_err(format!("copy {from} to {to}"), err))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Sample {
        Sample::new(
            2,
            Utf8PathBuf::from("in/iso_R1.fq.gz"),
            Utf8PathBuf::from("in/iso_R2.fq.gz"),
        )
        .unwrap()
    }

    #[test]
    fn layout_paths() {
        let layout = Layout::new("/work", "run");
        let sample = sample();
        assert_eq!(layout.sample_dir(&sample), "/work/run_2");
        assert_eq!(layout.contigs_path(&sample), "/work/run_2/assembly/contigs.fasta");
        assert_eq!(layout.staged_contigs_path(&sample), "/work/run_staging/iso_R2.fasta");
        assert_eq!(layout.typing_report_path(), "/work/run_mlst.tsv");
        assert_eq!(layout.named_sample_dir_name(&sample), "run_iso_R2");
        assert_eq!(layout.final_sample_dir(&sample), "/work/run/run_iso_R2");
        assert_eq!(layout.manifest_path(), "/work/run/run.json");
    }

    #[test]
    fn owned_dir_names() {
        let layout = Layout::new("/work", "run");
        for name in ["run", "run_staging", "run_1", "run_42"] {
            assert!(layout.owns_dir_name(name), "{name}");
        }
        for name in ["reads", "run_", "run_a", "run_1x", "runs", "run_mlst.tsv"] {
            assert!(!layout.owns_dir_name(name), "{name}");
        }
    }

    #[test]
    fn reset_dir_clears_previous_content() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().join("staging")).unwrap();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("stale.fasta"), ">x\nA\n").unwrap();

        reset_dir(&dir).unwrap();

        assert!(dir.as_std_path().is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }
}

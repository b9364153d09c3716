use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use mymlst::config::{PipelineConfig, RawOptions};
use mymlst::error::PipelineError;
use mymlst::pipeline::Pipeline;

// Only test in this binary, so the environment change cannot race another test.
#[test]
fn missing_tool_is_reported_before_input_is_read() {
    let temp = tempfile::tempdir().unwrap();
    let work = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    unsafe {
        std::env::set_var("MYMLST_SPADES", work.join("no-such-spades.py").as_str());
    }

    let mut raw = RawOptions::new(work.join("absent-reads").as_str());
    raw.work_dir = Some(work.to_string());
    let config = PipelineConfig::resolve(raw).unwrap();

    let err = Pipeline::discover(config).err().unwrap();

    assert_matches!(err, PipelineError::ToolMissing(ref tool) if tool == "spades.py");
    assert_eq!(err.exit_code(), 127);
    assert_eq!(fs::read_dir(&work).unwrap().count(), 0);
}

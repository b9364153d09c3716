use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error("input folder not found or not a directory: {0}")]
    #[diagnostic(
        code(mymlst::missing_input),
        help("pass an existing directory of FASTQ files with -f/--fastqfolder")
    )]
    MissingInput(Utf8PathBuf),

    #[error("invalid input: {0}")]
    #[diagnostic(
        code(mymlst::invalid_input),
        help("the input folder may only hold .fastq/.fq files (optionally gzipped) and -t must be a positive integer")
    )]
    InvalidInput(String),

    #[error("required tool not found: {0}")]
    #[diagnostic(
        code(mymlst::tool_missing),
        help("install the tool and make sure it is on PATH, or point the matching MYMLST_* variable at it")
    )]
    ToolMissing(String),

    #[error("{tool} exited with {}: {output}", exit_label(.code))]
    #[diagnostic(code(mymlst::tool_failure))]
    ExternalToolFailure {
        tool: String,
        code: Option<i32>,
        /// Last lines the tool wrote to stdout and stderr.
        output: String,
    },

    #[error("filesystem error: {0}")]
    #[diagnostic(code(mymlst::filesystem))]
    Filesystem(String),

    #[error("failed to write run manifest: {0}")]
    #[diagnostic(code(mymlst::manifest))]
    Manifest(String),
}

impl PipelineError {
    /// Process exit code reported by the binary for this error.
    ///
    /// 127 stays reserved for a missing tool, so a tool exiting 127 maps to 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::ToolMissing(_) => 127,
            PipelineError::ExternalToolFailure {
                code: Some(code), ..
            } if (1..=255).contains(code) && *code != 127 => *code as u8,
            _ => 1,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

pub(crate) fn fs_err(context: impl std::fmt::Display, err: std::io::Error) -> PipelineError {
    PipelineError::Filesystem(format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(PipelineError::ToolMissing("mlst".to_string()).exit_code(), 127);
        assert_eq!(
            PipelineError::InvalidInput("x".to_string()).exit_code(),
            1
        );
        let failure = PipelineError::ExternalToolFailure {
            tool: "prokka".to_string(),
            code: Some(2),
            output: String::new(),
        };
        assert_eq!(failure.exit_code(), 2);
        let killed = PipelineError::ExternalToolFailure {
            tool: "prokka".to_string(),
            code: None,
            output: String::new(),
        };
        assert_eq!(killed.exit_code(), 1);
    }

    #[test]
    fn tool_exiting_127_is_not_a_missing_tool() {
        let failure = PipelineError::ExternalToolFailure {
            tool: "spades.py".to_string(),
            code: Some(127),
            output: "python3: command not found".to_string(),
        };
        assert_eq!(failure.exit_code(), 1);
    }
}

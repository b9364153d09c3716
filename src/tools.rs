use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::debug;

use crate::error::{PipelineError, fs_err};

const OUTPUT_TAIL_LINES: usize = 20;

/// External programs the pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Assembler,
    Typer,
    Annotator,
    Converter,
}

impl Tool {
    pub fn program(self) -> &'static str {
        match self {
            Tool::Assembler => "spades.py",
            Tool::Typer => "mlst",
            Tool::Annotator => "prokka",
            Tool::Converter => "gffread",
        }
    }

    /// Environment variable that may name an explicit executable.
    pub fn env_override(self) -> &'static str {
        match self {
            Tool::Assembler => "MYMLST_SPADES",
            Tool::Typer => "MYMLST_MLST",
            Tool::Annotator => "MYMLST_PROKKA",
            Tool::Converter => "MYMLST_GFFREAD",
        }
    }

    pub fn required(convert_annotations: bool) -> Vec<Tool> {
        let mut tools = vec![Tool::Assembler, Tool::Typer, Tool::Annotator];
        if convert_annotations {
            tools.push(Tool::Converter);
        }
        tools
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program())
    }
}

/// One synchronous tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub tool: Tool,
    pub args: Vec<String>,
    /// File that receives the tool's standard output.
    pub stdout: Option<Utf8PathBuf>,
}

impl Invocation {
    pub fn new(tool: Tool, args: Vec<String>) -> Self {
        Self {
            tool,
            args,
            stdout: None,
        }
    }

    pub fn with_stdout(mut self, path: Utf8PathBuf) -> Self {
        self.stdout = Some(path);
        self
    }
}

pub trait ToolRunner {
    /// Runs the tool to completion; any non-success exit is an error.
    fn run(&self, invocation: &Invocation) -> Result<(), PipelineError>;
}

impl<T: ToolRunner + ?Sized> ToolRunner for &T {
    fn run(&self, invocation: &Invocation) -> Result<(), PipelineError> {
        (**self).run(invocation)
    }
}

/// Executables resolved from `PATH` or the `MYMLST_*` overrides.
#[derive(Debug, Clone)]
pub struct Toolchain {
    programs: HashMap<Tool, PathBuf>,
}

impl Toolchain {
    pub fn discover(tools: &[Tool]) -> Result<Self, PipelineError> {
        let mut programs = HashMap::new();
        for &tool in tools {
            let path =
                resolve_tool(tool).ok_or_else(|| PipelineError::ToolMissing(tool.to_string()))?;
            debug!(tool = %tool, path = %path.display(), "found tool");
            programs.insert(tool, path);
        }
        Ok(Self { programs })
    }

    pub fn program(&self, tool: Tool) -> Option<&Path> {
        self.programs.get(&tool).map(PathBuf::as_path)
    }
}

impl ToolRunner for Toolchain {
    fn run(&self, invocation: &Invocation) -> Result<(), PipelineError> {
        let tool = invocation.tool;
        let program = self
            .program(tool)
            .ok_or_else(|| PipelineError::ToolMissing(tool.to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(&invocation.args);
        if let Some(path) = &invocation.stdout {
            let file = fs::File::create(path.as_std_path())
                .map_err(|err| fs_err(format!("create {path}"), err))?;
            cmd.stdout(Stdio::from(file));
        }
        debug!(tool = %tool, args = ?invocation.args, "running");

        let output = cmd.output().map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => PipelineError::ToolMissing(tool.to_string()),
            _ => PipelineError::ExternalToolFailure {
                tool: tool.to_string(),
                code: None,
                output: err.to_string(),
            },
        })?;
        if output.status.success() {
            return Ok(());
        }
        Err(PipelineError::ExternalToolFailure {
            tool: tool.to_string(),
            code: output.status.code(),
            output: output_tail(&output.stdout, &output.stderr),
        })
    }
}

fn resolve_tool(tool: Tool) -> Option<PathBuf> {
    if let Some(value) = std::env::var_os(tool.env_override()) {
        let path = PathBuf::from(value);
        return path.is_file().then_some(path);
    }
    find_in_path(tool.program())
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.is_file() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.is_file() {
            return Some(plain);
        }
    }
    None
}

/// Some tools (SPAdes) report fatal errors on stdout, so both streams are kept.
fn output_tail(stdout: &[u8], stderr: &[u8]) -> String {
    let text = [stdout, stderr]
        .iter()
        .map(|bytes| String::from_utf8_lossy(bytes))
        .collect::<Vec<_>>()
        .join("\n");
    let lines = text.trim().lines().collect::<Vec<_>>();
    let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
    let tail = lines[start..].join("\n");
    if tail.is_empty() {
        "no error output".to_string()
    } else {
        tail
    }
}

/// Argument lists for each tool. Paths are passed through as given.
pub mod args {
    use camino::Utf8Path;

    use crate::domain::ThreadCount;
    use crate::workspace::ANNOTATION_PREFIX;

    pub fn assembler(
        forward: &Utf8Path,
        reverse: &Utf8Path,
        threads: ThreadCount,
        out_dir: &Utf8Path,
    ) -> Vec<String> {
        vec![
            "-1".to_string(),
            forward.to_string(),
            "-2".to_string(),
            reverse.to_string(),
            "-t".to_string(),
            threads.to_string(),
            "-o".to_string(),
            out_dir.to_string(),
        ]
    }

    pub fn typer<P: AsRef<Utf8Path>>(staged: &[P], threads: ThreadCount) -> Vec<String> {
        let mut args = vec!["--threads".to_string(), threads.to_string()];
        args.extend(staged.iter().map(|path| path.as_ref().to_string()));
        args
    }

    pub fn annotator(contigs: &Utf8Path, threads: ThreadCount, out_dir: &Utf8Path) -> Vec<String> {
        vec![
            "--cpus".to_string(),
            threads.to_string(),
            "--prefix".to_string(),
            ANNOTATION_PREFIX.to_string(),
            "--outdir".to_string(),
            out_dir.to_string(),
            "--force".to_string(),
            contigs.to_string(),
        ]
    }

    pub fn converter(annotation: &Utf8Path, converted: &Utf8Path) -> Vec<String> {
        vec![
            annotation.to_string(),
            "-T".to_string(),
            "-o".to_string(),
            converted.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;

    use super::*;
    use crate::domain::ThreadCount;

    #[test]
    fn converter_only_required_when_enabled() {
        assert!(!Tool::required(false).contains(&Tool::Converter));
        assert!(Tool::required(true).contains(&Tool::Converter));
    }

    #[test]
    fn typer_args_list_every_staged_file() {
        let threads: ThreadCount = "4".parse().unwrap();
        let staged = [Utf8Path::new("s/a.fasta"), Utf8Path::new("s/b.fasta")];
        assert_eq!(
            args::typer(&staged, threads),
            vec!["--threads", "4", "s/a.fasta", "s/b.fasta"]
        );
    }

    #[test]
    fn annotator_args_use_fixed_prefix() {
        let threads: ThreadCount = "2".parse().unwrap();
        let args = args::annotator(Utf8Path::new("c.fasta"), threads, Utf8Path::new("out"));
        let prefix = args.iter().position(|arg| arg == "--prefix").unwrap();
        assert_eq!(args[prefix + 1], "prokka");
        assert_eq!(args.last().map(String::as_str), Some("c.fasta"));
    }

    #[test]
    fn output_tail_keeps_last_lines() {
        let stderr = (0..30).map(|i| format!("line {i}\n")).collect::<String>();
        let tail = output_tail(b"", stderr.as_bytes());
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 29"));
        assert_eq!(output_tail(b"", b""), "no error output");
    }

    #[cfg(unix)]
    #[test]
    fn failure_reports_what_the_tool_printed_on_stdout() {
        let temp = tempfile::tempdir().unwrap();
        let script = temp.path().join("spades.sh");
        fs::write(
            &script,
            "echo '== Error ==  system call for: corrector finished abnormally'\nexit 1\n",
        )
        .unwrap();
        let toolchain = Toolchain {
            programs: HashMap::from([(Tool::Assembler, PathBuf::from("/bin/sh"))]),
        };
        let invocation = Invocation::new(
            Tool::Assembler,
            vec![script.to_string_lossy().to_string()],
        );

        let err = toolchain.run(&invocation).unwrap_err();

        match err {
            PipelineError::ExternalToolFailure { code, output, .. } => {
                assert_eq!(code, Some(1));
                assert!(output.contains("== Error =="), "got {output:?}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

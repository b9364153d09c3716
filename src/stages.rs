use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{Sample, ThreadCount};
use crate::error::{PipelineError, fs_err};
use crate::tools::{Invocation, Tool, ToolRunner, args};
use crate::workspace::{
    ANNOTATION_FILE, CONVERTED_ANNOTATION_FILE, Layout, copy_file, replace_dir, reset_dir,
};

pub const REFERENCE_HEADER: &str = ">Assembly";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyResult {
    pub sample: usize,
    pub contigs: Utf8PathBuf,
    pub reference_assembly: Utf8PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationResult {
    pub sample: usize,
    pub annotation: Utf8PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypingReport {
    pub path: Utf8PathBuf,
    pub rows: usize,
}

pub fn assemble(
    runner: &dyn ToolRunner,
    layout: &Layout,
    threads: ThreadCount,
    sample: &Sample,
) -> Result<AssemblyResult, PipelineError> {
    let out_dir = layout.assembly_dir(sample);
    info!(sample = sample.index, out = %out_dir, "assembling");
    runner.run(&Invocation::new(
        Tool::Assembler,
        args::assembler(&sample.forward, &sample.reverse, threads, &out_dir),
    ))?;

    let contigs = layout.contigs_path(sample);
    if !contigs.as_std_path().is_file() {
        return Err(PipelineError::ExternalToolFailure {
            tool: Tool::Assembler.to_string(),
            code: None,
            output: format!("exited successfully but {contigs} is missing"),
        });
    }

    let reference_assembly = layout.reference_assembly_path(sample);
    let lines = build_reference_assembly(&contigs, &reference_assembly)?;
    info!(sample = sample.index, sequence_lines = lines, "wrote reference assembly");

    Ok(AssemblyResult {
        sample: sample.index,
        contigs,
        reference_assembly,
    })
}

/// Joins every sequence line of a FASTA file under one `>Assembly` header.
///
/// Returns the number of sequence lines written.
pub fn build_reference_assembly(
    contigs: &Utf8Path,
    destination: &Utf8Path,
) -> Result<usize, PipelineError> {
    let input = fs::File::open(contigs.as_std_path())
        .map_err(|err| fs_err(format!("open {contigs}"), err))?;
    let output = fs::File::create(destination.as_std_path())
        .map_err(|err| fs_err(format!("create {destination}"), err))?;
    let mut writer = BufWriter::new(output);
    let write_err = |err| fs_err(format!("write {destination}"), err);

    writeln!(writer, "{REFERENCE_HEADER}").map_err(write_err)?;
    let mut count = 0;
    for line in BufReader::new(input).lines() {
        let line = line.map_err(|err| fs_err(format!("read {contigs}"), err))?;
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('>') {
            continue;
        }
        writeln!(writer, "{line}").map_err(write_err)?;
        count += 1;
    }
    writer.flush().map_err(write_err)?;
    Ok(count)
}

/// Copies each sample's contigs into a freshly reset staging directory.
pub fn stage_contigs(
    layout: &Layout,
    samples: &[Sample],
    assemblies: &[AssemblyResult],
) -> Result<Vec<Utf8PathBuf>, PipelineError> {
    let staging = layout.staging_dir();
    reset_dir(&staging)?;

    let mut staged = Vec::with_capacity(samples.len());
    for (sample, assembly) in samples.iter().zip(assemblies) {
        let target = layout.staged_contigs_path(sample);
        copy_file(&assembly.contigs, &target)?;
        staged.push(target);
    }
    info!(dir = %staging, files = staged.len(), "staged contigs for typing");
    Ok(staged)
}

/// Runs the typer once over every staged file.
pub fn type_samples(
    runner: &dyn ToolRunner,
    layout: &Layout,
    threads: ThreadCount,
    staged: &[Utf8PathBuf],
) -> Result<TypingReport, PipelineError> {
    let mut staged = staged.to_vec();
    staged.sort();
    let path = layout.typing_report_path();
    info!(files = staged.len(), report = %path, "typing");
    runner.run(
        &Invocation::new(Tool::Typer, args::typer(&staged, threads)).with_stdout(path.clone()),
    )?;

    let content = fs::read_to_string(path.as_std_path())
        .map_err(|err| fs_err(format!("read {path}"), err))?;
    let rows = content.lines().filter(|line| !line.trim().is_empty()).count();
    if rows != staged.len() {
        warn!(rows, samples = staged.len(), "typing report row count differs from sample count");
    }
    Ok(TypingReport { path, rows })
}

pub fn annotate(
    runner: &dyn ToolRunner,
    layout: &Layout,
    threads: ThreadCount,
    sample: &Sample,
    assembly: &AssemblyResult,
) -> Result<AnnotationResult, PipelineError> {
    let out_dir = layout.annotation_dir(sample);
    info!(sample = sample.index, out = %out_dir, "annotating");
    runner.run(&Invocation::new(
        Tool::Annotator,
        args::annotator(&assembly.contigs, threads, &out_dir),
    ))?;
    Ok(AnnotationResult {
        sample: sample.index,
        annotation: out_dir.join(ANNOTATION_FILE),
    })
}

/// Index-keyed sample directories `{run}_{n}` directly under the working root, sorted.
pub fn indexed_sample_dirs(layout: &Layout) -> Result<Vec<Utf8PathBuf>, PipelineError> {
    let pattern = Regex::new(&format!("^{}_[0-9]+$", regex::escape(layout.run_name())))
        .map_err(|err| PipelineError::InvalidInput(err.to_string()))?;
    let work_dir = layout.work_dir();
    let entries = work_dir
        .read_dir_utf8()
        .map_err(|err| fs_err(format!("read {work_dir}"), err))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| fs_err(format!("read {work_dir}"), err))?;
        if entry.path().is_dir() && pattern.is_match(entry.file_name()) {
            dirs.push(entry.path().to_path_buf());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Converts the annotation of every index-keyed sample directory that belongs to this run.
///
/// Leftover `{run}_{n}` directories from earlier runs are skipped.
pub fn convert_annotations(
    runner: &dyn ToolRunner,
    layout: &Layout,
    samples: &[Sample],
) -> Result<Vec<Utf8PathBuf>, PipelineError> {
    let current = samples
        .iter()
        .map(|sample| layout.sample_dir(sample))
        .collect::<HashSet<_>>();
    let mut converted = Vec::new();
    for dir in indexed_sample_dirs(layout)? {
        if !current.contains(&dir) {
            debug!(dir = %dir, "skipping directory from another run");
            continue;
        }
        let annotation = dir.join("annotation").join(ANNOTATION_FILE);
        if !annotation.as_std_path().is_file() {
            warn!(dir = %dir, "no annotation to convert");
            continue;
        }
        let target = dir.join("annotation").join(CONVERTED_ANNOTATION_FILE);
        info!(annotation = %annotation, "converting annotation");
        runner.run(&Invocation::new(
            Tool::Converter,
            args::converter(&annotation, &target),
        ))?;
        converted.push(target);
    }
    Ok(converted)
}

/// Moves every `{run}_{index}` directory to `{run}/{run}_{name}` under a reset output root.
pub fn reconcile(layout: &Layout, samples: &[Sample]) -> Result<Vec<Utf8PathBuf>, PipelineError> {
    let root = layout.output_root();
    reset_dir(&root)?;

    let mut moved = Vec::with_capacity(samples.len());
    for sample in samples {
        let from = layout.sample_dir(sample);
        let to = layout.final_sample_dir(sample);
        replace_dir(&from, &to)?;
        info!(sample = sample.index, to = %to, "moved sample output");
        moved.push(to);
    }
    Ok(moved)
}

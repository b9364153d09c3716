use chrono::Utc;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::manifest::{RunSummary, SampleEntry, timestamp, write_manifest};
use crate::pairing::pair_samples;
use crate::stages;
use crate::tools::{Tool, ToolRunner, Toolchain};
use crate::validate;
use crate::workspace::{CONVERTED_ANNOTATION_FILE, Layout, remove_dir};

/// Runs every stage in order and stops at the first failure.
pub struct Pipeline<R: ToolRunner> {
    config: PipelineConfig,
    layout: Layout,
    runner: R,
}

impl Pipeline<Toolchain> {
    /// Resolves the tools this configuration needs. Touches nothing on disk.
    pub fn discover(config: PipelineConfig) -> Result<Self, PipelineError> {
        let toolchain = Toolchain::discover(&Tool::required(config.convert_annotations))?;
        Ok(Self::new(config, toolchain))
    }
}

impl<R: ToolRunner> Pipeline<R> {
    pub fn new(config: PipelineConfig, runner: R) -> Self {
        let layout = Layout::from_config(&config);
        Self {
            config,
            layout,
            runner,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn run(&self) -> Result<RunSummary, PipelineError> {
        let started_at = Utc::now();
        let config = &self.config;
        let layout = &self.layout;
        let threads = config.threads;

        let names = validate::input_folder(&config.input_folder)?;
        validate::outside_run_outputs(&config.input_folder, layout)?;
        let pairing = pair_samples(&config.input_folder, names)?;
        let samples = &pairing.samples;
        info!(samples = samples.len(), run = %config.run_name, "starting run");

        let assemblies = samples
            .iter()
            .map(|sample| stages::assemble(&self.runner, layout, threads, sample))
            .collect::<Result<Vec<_>, _>>()?;

        let staged = stages::stage_contigs(layout, samples, &assemblies)?;
        let report = stages::type_samples(&self.runner, layout, threads, &staged)?;
        remove_dir(&layout.staging_dir())?;
        info!(report = %report.path, rows = report.rows, "typing finished");

        for (sample, assembly) in samples.iter().zip(&assemblies) {
            stages::annotate(&self.runner, layout, threads, sample, assembly)?;
        }

        if config.convert_annotations {
            let converted = stages::convert_annotations(&self.runner, layout, samples)?;
            info!(files = converted.len(), "conversion finished");
        }

        let moved = stages::reconcile(layout, samples)?;

        let entries = samples
            .iter()
            .zip(moved)
            .map(|(sample, directory)| {
                let converted = directory.join("annotation").join(CONVERTED_ANNOTATION_FILE);
                SampleEntry {
                    index: sample.index,
                    name: sample.derived_name.clone(),
                    forward: sample.forward.clone(),
                    reverse: sample.reverse.clone(),
                    converted_annotation: converted.as_std_path().is_file().then_some(converted),
                    directory,
                }
            })
            .collect();

        let summary = RunSummary {
            run_name: config.run_name.clone(),
            threads,
            conversion: config.convert_annotations,
            tools: Tool::required(config.convert_annotations),
            started_at: timestamp(started_at),
            finished_at: timestamp(Utc::now()),
            output_root: layout.output_root(),
            typing_report: report.path,
            typing_rows: report.rows,
            unpaired_file: pairing.unpaired.clone(),
            samples: entries,
        };
        write_manifest(&layout.manifest_path(), &summary)?;
        info!(output = %summary.output_root, "run complete");
        Ok(summary)
    }
}

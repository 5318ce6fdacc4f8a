use std::fs;
use std::path::Path;
use std::thread;

use anyhow::{anyhow, bail, Context, Result};
use junos_convert::convert::convert;
use junos_convert::loader::load_config;
use junos_convert::report::{render_check_text, CheckReport};
use junos_convert::settings::{load_settings, ConvertSettings};
use junos_convert::warnings::Warnings;
use packet_model::{write_file, Configuration};
use tracing::info;

use crate::cli::{CompileArgs, OutputFormat};

/// Load and compile one document. Failures land in the report's `error`.
pub fn compile_file(
    path: &Path,
    settings: &ConvertSettings,
    settings_source: &str,
) -> (CheckReport, Option<Configuration>) {
    let source = path.display().to_string();
    let config = match load_config(path) {
        Ok(config) => config,
        Err(err) => {
            let hostname = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut report = CheckReport::new(hostname, source, settings_source, Warnings::new());
            report.error = Some(err.to_string());
            return (report, None);
        }
    };

    let mut warnings = Warnings::new();
    let result = convert(&config, settings, &mut warnings);
    let mut report = CheckReport::new(config.hostname.clone(), source, settings_source, warnings);
    match result {
        Ok(target) => {
            report.dangling_acls = target.dangling_acl_references();
            (report, Some(target))
        }
        Err(err) => {
            report.error = Some(err.to_string());
            (report, None)
        }
    }
}

pub fn run_compile(args: CompileArgs) -> Result<()> {
    let (settings, settings_source) =
        load_settings(args.settings.as_deref()).context("failed to load settings")?;
    fs::create_dir_all(&args.output_dir).with_context(|| {
        format!("failed to create output directory {}", args.output_dir.display())
    })?;

    let settings = &settings;
    let settings_source = settings_source.as_str();
    let results = thread::scope(|scope| {
        let handles = args
            .inputs
            .iter()
            .map(|path| scope.spawn(move || compile_file(path, settings, settings_source)))
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| handle.join().map_err(|_| anyhow!("compile worker panicked")))
            .collect::<Result<Vec<_>>>()
    })?;

    let mut reports = Vec::with_capacity(results.len());
    for (report, target) in results {
        if let Some(target) = target {
            let out_path = args.output_dir.join(format!("{}.json", target.hostname));
            write_file(&target, &out_path)
                .with_context(|| format!("failed to write {}", out_path.display()))?;
            info!(
                hostname = %target.hostname,
                acls = target.acls.len(),
                warnings = report.warning_count(),
                "wrote {}",
                out_path.display()
            );
        }
        reports.push(report);
    }

    match args.format {
        OutputFormat::Text => {
            for report in &reports {
                println!("{}", render_check_text(report, false));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }

    let failed = reports.iter().filter(|report| report.failed()).count();
    if failed > 0 {
        bail!("compile failed: {failed} of {} configurations", reports.len());
    }
    let warnings = reports.iter().map(CheckReport::warning_count).sum::<usize>();
    if args.strict && warnings > 0 {
        bail!("compile failed in strict mode: {warnings} warnings");
    }
    Ok(())
}

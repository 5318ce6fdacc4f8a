use anyhow::{bail, Context, Result};
use junos_convert::report::render_check_text;
use junos_convert::settings::load_settings;

use crate::cli::{CheckArgs, OutputFormat};
use crate::compile_cmd::compile_file;

pub fn run_check(args: CheckArgs) -> Result<()> {
    let (settings, settings_source) =
        load_settings(args.settings.as_deref()).context("failed to load settings")?;
    let (report, _) = compile_file(&args.input, &settings, &settings_source);

    match args.format {
        OutputFormat::Text => println!("{}", render_check_text(&report, true)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if let Some(error) = &report.error {
        bail!("check failed: {error}");
    }
    if args.strict && report.warning_count() > 0 {
        bail!("check failed in strict mode: {} warnings", report.warning_count());
    }
    Ok(())
}

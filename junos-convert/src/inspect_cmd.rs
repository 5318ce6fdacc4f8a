use anyhow::{anyhow, Context, Result};
use junos_convert::report::render_compiled;
use packet_model::parse_file;

use crate::cli::InspectArgs;

pub fn run_inspect(args: InspectArgs) -> Result<()> {
    let target = parse_file(&args.file)
        .with_context(|| format!("failed to parse {}", args.file.display()))?;
    let text = render_compiled(&target, args.interface.as_deref(), args.acl.as_deref())
        .map_err(|reason| anyhow!("inspect failed: {reason}"))?;
    println!("{text}");
    Ok(())
}

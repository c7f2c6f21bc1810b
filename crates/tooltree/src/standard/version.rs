//! `version`

use anyhow::anyhow;
use tooltree_dispatch::{CommandSpec, FunctionArgs, Handler, CONTEXT_KEY};

use crate::output::{Output, OUTPUT_KEY};

pub(crate) fn command_spec() -> CommandSpec {
    CommandSpec::new(Handler::from_fn(version_command))
        .help("print cli version")
        .extra_data(CONTEXT_KEY)
        .extra_data(OUTPUT_KEY)
}

fn version_command(args: &FunctionArgs) -> anyhow::Result<()> {
    let ctx = args.context()?;
    let version = ctx
        .config
        .version
        .as_deref()
        .ok_or_else(|| anyhow!("unknown version"))?;
    args.extra::<Output>(OUTPUT_KEY)?.line(version)?;
    Ok(())
}

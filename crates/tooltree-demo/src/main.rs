use std::process::ExitCode;

use tooltree::Output;

fn main() -> ExitCode {
    tooltree::logging::init();

    match tooltree_demo::app(&tooltree_demo::store_path(), Output::stdout()) {
        Ok(app) => app.run(),
        Err(err) => {
            eprintln!("ttdemo is misconfigured: {}", err);
            ExitCode::FAILURE
        }
    }
}

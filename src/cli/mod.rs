//! Command-line interface.

pub mod args;

pub use args::Cli;

use crate::error::Result;
use crate::runner::Stagehand;
use crate::stagefile::{apply, discover, load_stagefile};
use crate::ui::UserInterface;

/// Load the stagefile and dispatch the task words of `cli`.
pub fn run(cli: &Cli, ui: Box<dyn UserInterface>) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let path = discover(cli.file.as_deref(), &cwd)?;
    tracing::debug!("using stagefile {}", path.display());

    let file = load_stagefile(&path)?;
    let mut stagehand = Stagehand::new().with_boxed_ui(ui);
    apply(file, &mut stagehand)?;

    stagehand.run(cli.args.iter().cloned())
}

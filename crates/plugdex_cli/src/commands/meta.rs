//! Shell completions and man pages for the `plugdex` binary.

use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::CommandFactory;

use crate::Cli;

/// Write the completion script for `shell` under the binary's own name.
fn write_completions(shell: clap_complete::Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, bin, out);
}

/// Render the top-level page, which lists every subcommand.
fn write_overview_page(out: &mut dyn Write) -> std::io::Result<()> {
    clap_mangen::Man::new(Cli::command()).render(out)
}

/// Write one page per command into `dir` and return how many were written.
fn write_page_set(dir: &Path) -> std::io::Result<usize> {
    std::fs::create_dir_all(dir)?;
    clap_mangen::generate_to(Cli::command(), dir)?;

    let mut pages = 0;
    for entry in std::fs::read_dir(dir)? {
        if entry?.path().extension().is_some_and(|ext| ext == "1") {
            pages += 1;
        }
    }
    Ok(pages)
}

/// Handle `plugdex completions`.
pub(crate) fn handle_completions(shell: clap_complete::Shell) -> Result<(), Box<dyn Error>> {
    let mut stdout = std::io::stdout().lock();
    write_completions(shell, &mut stdout);
    stdout.flush()?;
    Ok(())
}

/// Handle `plugdex man`.
pub(crate) fn handle_man(output: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    match output {
        Some(dir) => {
            let pages = write_page_set(&dir)?;
            println!("Wrote {pages} man pages to {}", dir.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            write_overview_page(&mut stdout)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

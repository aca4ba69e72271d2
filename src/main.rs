use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use overlay_fsck::{
    checker::{CheckerOptions, FilesystemChecker},
    error::OverlayError,
    overlay::{header::HeaderType, Overlay},
    pretty_print::PPOverlay,
};

#[derive(Parser, Debug)]
#[command(name = "overlay-fsck")]
#[command(about = "Check the consistency of a materialized-inode overlay directory")]
struct Cli {
    /// Print debug traces of overlay operations to stderr.
    #[arg(long, global = true, default_value_t = false)]
    trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the overlay and report problems.
    Scan {
        /// Overlay root directory.
        overlay: PathBuf,

        /// Print the detail block under each problem.
        #[arg(short, long, default_value_t = false)]
        verbose: bool,

        /// Also print the problems as JSON once the scan is done.
        #[cfg(feature = "json")]
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Resolve a relative path to an inode number using only the overlay.
    Lookup { overlay: PathBuf, path: String },
    /// Dump the header and directory entries of one inode.
    Show { overlay: PathBuf, inode: u64 },
}

/// Lookup and show failures exit with the errno of the overlay error.
fn exit_with(err: OverlayError) -> ! {
    eprintln!("error: {}", err);
    std::process::exit(err.errno());
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.trace {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Trace)
            .target(env_logger::Target::Stderr)
            .init();
    }

    match cli.command {
        Command::Scan {
            overlay,
            verbose,
            #[cfg(feature = "json")]
            json,
        } => {
            let overlay = Overlay::new(overlay);
            let mut checker = FilesystemChecker::new(&overlay, CheckerOptions { verbose });
            checker
                .scan_for_errors()
                .with_context(|| format!("failed to scan {}", overlay.path().display()))?;
            #[cfg(feature = "json")]
            if json {
                println!("{}", checker.errors_json()?);
            }
            let failed = checker.has_errors();
            let count = checker.errors().len();
            drop(checker);
            if count == 0 {
                println!("No issues found");
            }
            if failed {
                std::process::exit(1);
            }
        }
        Command::Lookup { overlay, path } => {
            let overlay = Overlay::new(overlay);
            match overlay.lookup_path(&path) {
                Ok(Some(ino)) => println!("{}", ino),
                Ok(None) => println!("{}: not materialized, needs source control data", path),
                Err(e) => exit_with(e),
            }
        }
        Command::Show { overlay, inode } => {
            let overlay = Overlay::new(overlay);
            let header = match overlay
                .open_overlay_file(inode)
                .and_then(|mut f| overlay.read_header(&mut f))
            {
                Ok(header) => header,
                Err(e) => exit_with(e),
            };
            println!("{}", header.ppoverlay());
            if header.kind == HeaderType::Directory {
                println!("{}", overlay.read_dir_inode(inode).ppoverlay());
            }
        }
    }
    Ok(())
}

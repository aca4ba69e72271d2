use std::io::{self, Write};

use serde::Deserialize;

use crate::{
    diagnostics::{Diagnostic, ErrorLevel},
    error::OverlayResult,
    log_call, log_res,
    overlay::{lock::OverlayLock, Overlay},
};

pub mod classify;
pub mod link;
pub mod load;
pub mod read_inodes;

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct CheckerOptions {
    /// Print the detail block under each diagnostic that has one.
    pub verbose: bool,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ScanPhase {
    Locking,
    Enumerating,
    Linking,
    Classifying,
    Done,
}

/// Offline consistency check of an overlay directory.
///
/// The overlay lock is attempted when the checker is created and held until
/// it is dropped. Scanning never writes to the overlay, so it proceeds even
/// without the lock.
pub struct FilesystemChecker<'a, W: Write = io::Stdout> {
    overlay: &'a Overlay,
    options: CheckerOptions,
    lock: OverlayLock,
    phase: ScanPhase,
    errors: Vec<Diagnostic>,
    out: W,
}

impl<'a> FilesystemChecker<'a, io::Stdout> {
    pub fn new(overlay: &'a Overlay, options: CheckerOptions) -> Self {
        Self::with_output(overlay, options, io::stdout())
    }
}

impl<'a, W: Write> FilesystemChecker<'a, W> {
    pub fn with_output(overlay: &'a Overlay, options: CheckerOptions, out: W) -> Self {
        let lock = overlay.try_lock();
        Self {
            overlay,
            options,
            lock,
            phase: ScanPhase::Locking,
            errors: Vec::new(),
            out,
        }
    }

    pub fn overlay(&self) -> &Overlay {
        self.overlay
    }

    pub fn overlay_locked(&self) -> bool {
        self.lock.is_locked()
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|e| e.level() == ErrorLevel::Error)
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Releases the lock and hands back the diagnostics and output sink.
    pub fn finish(self) -> (Vec<Diagnostic>, W) {
        (self.errors, self.out)
    }

    pub fn scan_for_errors(&mut self) -> OverlayResult<()> {
        let callid = log_call!("SCAN", "path={:?}", self.overlay.path());
        writeln!(
            self.out,
            "Checking overlay storage at {}.",
            self.overlay.path().display()
        )?;
        writeln!(self.out, "This may take some time...")?;

        if !self.overlay_locked() {
            writeln!(self.out, "Warning: unable to lock the overlay directory")?;
            writeln!(
                self.out,
                "Will only scan for issues.  In order to fix problems you must first unmount the checkout."
            )?;
        }

        self.enter(ScanPhase::Enumerating);
        writeln!(self.out, "Reading materialized inodes...")?;
        let mut inodes = self.read_inodes()?;
        writeln!(self.out, "Found {} materialized inodes", inodes.len())?;

        self.enter(ScanPhase::Linking);
        writeln!(self.out, "Computing directory relationships...")?;
        self.link_inode_children(&mut inodes)?;

        self.enter(ScanPhase::Classifying);
        writeln!(self.out, "Scanning for inconsistencies...")?;
        self.scan_inodes_for_errors(&inodes)?;

        self.enter(ScanPhase::Done);
        log_res!(callid, "{} problems", self.errors.len());
        Ok(())
    }

    fn enter(&mut self, phase: ScanPhase) {
        log::debug!("scan phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Prints a diagnostic as soon as it is found and keeps it for later.
    fn add_error(&mut self, error: Diagnostic) -> OverlayResult<()> {
        writeln!(self.out, "{}: {}", error.level().label(), error)?;
        if self.options.verbose {
            if let Some(details) = error.detailed_description() {
                for line in details.lines() {
                    writeln!(self.out, "  {}", line)?;
                }
            }
        }
        self.errors.push(error);
        Ok(())
    }

    #[cfg(feature = "json")]
    pub fn errors_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.errors)
    }
}

//! Core utilities and shared types
//!
//! Command output goes either straight to stdout or through the minus pager.

use derive_new::new;
use is_terminal::IsTerminal;
use minus::Pager;
use std::io::{self, Write};

/// Set to any value to never page, as tests and scripts do
pub const NO_PAGER_ENV: &str = "NO_PAGER";

/// Wrapper that implements `Write` for the minus pager
///
/// The minus pager doesn't implement `std::io::Write` directly; this adapts
/// it so commands can write to it like any other stream.
#[derive(new)]
pub struct PagerWriter {
    pager: Pager,
}

impl PagerWriter {
    pub fn pager(&self) -> &Pager {
        &self.pager
    }
}

impl Write for PagerWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s =
            std::str::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.pager.push_str(s).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Where a command writes its output
pub enum Output {
    Stdout(io::Stdout),
    Paged(PagerWriter),
}

impl Output {
    /// Page only when asked to and stdout is an interactive terminal
    pub fn open(allow_pager: bool) -> Self {
        let stdout = io::stdout();
        let wants_pager = allow_pager && std::env::var_os(NO_PAGER_ENV).is_none();

        if wants_pager && stdout.is_terminal() {
            Output::Paged(PagerWriter::new(Pager::new()))
        } else {
            Output::Stdout(stdout)
        }
    }

    /// Show the pager, if any, once everything has been written
    pub fn finish(self) -> anyhow::Result<()> {
        match self {
            Output::Stdout(mut stdout) => stdout.flush()?,
            Output::Paged(writer) => minus::page_all(writer.pager().clone())?,
        }

        Ok(())
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(stdout) => stdout.write(buf),
            Output::Paged(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(stdout) => stdout.flush(),
            Output::Paged(writer) => writer.flush(),
        }
    }
}

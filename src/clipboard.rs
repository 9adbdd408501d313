//! Copy affordance with a fallback when no clipboard exists.

use std::io::Write;

/// Where copied text actually landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDestination {
    Clipboard,
    Stdout,
}

impl std::fmt::Display for CopyDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Clipboard => "clipboard",
            Self::Stdout => "stdout",
        })
    }
}

/// Copy `text`, preferring the system clipboard.
///
/// Headless sessions have no clipboard; the text is printed instead so it
/// can still be piped or selected.
pub fn copy_text(text: &str) -> anyhow::Result<CopyDestination> {
    match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text.to_string())) {
        Ok(()) => Ok(CopyDestination::Clipboard),
        Err(err) => {
            tracing::warn!("clipboard unavailable, printing instead: {err}");
            let mut stdout = std::io::stdout();
            stdout.write_all(text.as_bytes())?;
            stdout.write_all(b"\n")?;
            Ok(CopyDestination::Stdout)
        }
    }
}

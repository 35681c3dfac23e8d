use anyhow::{Context, Result};
use tracing::warn;

/// Write-only clipboard used by the copy buttons.
pub trait ClipboardSink {
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// System clipboard; opened lazily so headless sessions never touch the display server.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        if self.inner.is_none() {
            self.inner = Some(arboard::Clipboard::new().context("clipboard unavailable")?);
        }
        let Some(clipboard) = self.inner.as_mut() else {
            anyhow::bail!("clipboard unavailable");
        };
        clipboard
            .set_text(text.to_string())
            .context("clipboard write failed")?;
        Ok(())
    }
}

/// Best effort: on failure the text is printed so the user can copy it by hand.
///
/// Returns whether the clipboard accepted the text.
pub fn copy_or_print(sink: &mut dyn ClipboardSink, label: &str, text: &str) -> bool {
    match sink.set_text(text) {
        Ok(()) => {
            println!("Copied {label} to clipboard.");
            true
        }
        Err(err) => {
            warn!("{err:#}");
            println!("Clipboard unavailable; {label}:");
            println!("{text}");
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use anyhow::{bail, Result};

    use super::ClipboardSink;

    #[derive(Default)]
    pub struct MemoryClipboard {
        pub contents: Vec<String>,
        pub broken: bool,
    }

    impl ClipboardSink for MemoryClipboard {
        fn set_text(&mut self, text: &str) -> Result<()> {
            if self.broken {
                bail!("no display");
            }
            self.contents.push(text.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::copy_or_print;
    use super::testing::MemoryClipboard;

    #[test]
    fn copy_reports_success_and_stores_text() {
        let mut sink = MemoryClipboard::default();
        assert!(copy_or_print(&mut sink, "title", "Widget"));
        assert_eq!(sink.contents, vec!["Widget"]);
    }

    #[test]
    fn broken_clipboard_is_not_an_error() {
        let mut sink = MemoryClipboard {
            broken: true,
            ..MemoryClipboard::default()
        };
        assert!(!copy_or_print(&mut sink, "title", "Widget"));
        assert!(sink.contents.is_empty());
    }
}

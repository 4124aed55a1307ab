//! Keyboard shortcut listing.

use easel_core::Kernel;

/// A shortcut bound by a registered plugin.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortcutEntry {
    pub plugin: String,
    pub identifier: String,
    /// Display form, e.g. "Ctrl+Shift+Z".
    pub keys: String,
}

/// Every shortcut bound in `kernel`, in registration order.
pub fn collect(kernel: &Kernel) -> Vec<ShortcutEntry> {
    kernel
        .shortcuts()
        .into_iter()
        .map(|(plugin, identifier, shortcut)| ShortcutEntry {
            plugin,
            identifier,
            keys: shortcut.format(),
        })
        .collect()
}

/// Render the shortcut table shown by `easel shortcuts`.
pub fn render(entries: &[ShortcutEntry]) -> String {
    let mut out = String::from("\n=== Keyboard Shortcuts ===\n");
    for entry in entries {
        out.push_str(&format!("  {:20} {}\n", entry.keys, entry.plugin));
    }
    out
}

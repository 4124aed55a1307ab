//! Keyboard shortcut parsing and matching.

use crate::error::{KernelError, KernelResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Modifier key state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    pub const fn meta() -> Self {
        Self {
            meta: true,
            ..Self::NONE
        }
    }

    pub const fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

/// Whether a key went down or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPhase {
    Down,
    Up,
}

/// A key event delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Logical key name, e.g. `"z"`, `"Delete"`.
    pub key: String,
    #[serde(default)]
    pub modifiers: Modifiers,
    pub phase: KeyPhase,
}

impl KeyEvent {
    pub fn down(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
            phase: KeyPhase::Down,
        }
    }

    pub fn up(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
            phase: KeyPhase::Up,
        }
    }
}

/// A parsed shortcut identifier such as `ctrl+shift+z`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shortcut {
    /// Lower-cased key name.
    pub key: String,
    pub modifiers: Modifiers,
}

impl Shortcut {
    /// Parse `modifier+...+key`. Modifier names: `ctrl`/`control`,
    /// `shift`, `alt`/`option`, `meta`/`cmd`/`command`/`⌘`.
    pub fn parse(identifier: &str) -> KernelResult<Self> {
        let invalid = || KernelError::InvalidShortcut(identifier.to_string());
        let parts: Vec<String> = identifier
            .split('+')
            .map(|part| part.trim().to_lowercase())
            .collect();
        let Some((key, modifier_names)) = parts.split_last() else {
            return Err(invalid());
        };
        if key.is_empty() {
            return Err(invalid());
        }

        let mut modifiers = Modifiers::NONE;
        for name in modifier_names {
            let flag = match name.as_str() {
                "ctrl" | "control" => &mut modifiers.ctrl,
                "shift" => &mut modifiers.shift,
                "alt" | "option" => &mut modifiers.alt,
                "meta" | "cmd" | "command" | "⌘" => &mut modifiers.meta,
                _ => return Err(invalid()),
            };
            if *flag {
                return Err(invalid());
            }
            *flag = true;
        }

        Ok(Self {
            key: key.clone(),
            modifiers,
        })
    }

    /// Exact match: same key (case-insensitive) and the same modifier set.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        event.modifiers == self.modifiers && event.key.to_lowercase() == self.key
    }

    /// Format the shortcut for display (e.g., "Ctrl+Shift+Z").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.modifiers.ctrl {
            parts.push("Ctrl".to_string());
        }
        if self.modifiers.alt {
            parts.push("Alt".to_string());
        }
        if self.modifiers.shift {
            parts.push("Shift".to_string());
        }
        if self.modifiers.meta {
            parts.push("Cmd".to_string());
        }
        let mut chars = self.key.chars();
        let key = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        parts.push(key);
        parts.join("+")
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modifiers_in_any_order() {
        let a = Shortcut::parse("ctrl+shift+z").unwrap();
        let b = Shortcut::parse("Shift+Ctrl+Z").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.modifiers, Modifiers::ctrl().with_shift());
        assert_eq!(a.format(), "Ctrl+Shift+Z");
    }

    #[test]
    fn test_parse_meta_aliases() {
        for id in ["meta+z", "cmd+z", "⌘+z"] {
            assert_eq!(Shortcut::parse(id).unwrap().modifiers, Modifiers::meta());
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Shortcut::parse("").is_err());
        assert!(Shortcut::parse("ctrl+").is_err());
        assert!(Shortcut::parse("hyper+z").is_err());
        assert!(Shortcut::parse("ctrl+ctrl+z").is_err());
    }

    #[test]
    fn test_match_requires_exact_modifiers() {
        let undo = Shortcut::parse("ctrl+z").unwrap();
        assert!(undo.matches(&KeyEvent::down("Z", Modifiers::ctrl())));
        assert!(undo.matches(&KeyEvent::up("z", Modifiers::ctrl())));
        assert!(!undo.matches(&KeyEvent::down("z", Modifiers::ctrl().with_shift())));
        assert!(!undo.matches(&KeyEvent::down("z", Modifiers::NONE)));
    }
}

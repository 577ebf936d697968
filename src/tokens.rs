//! The token table: single-character keys mapped to their current values.
//!
//! Keys fall into lifetime classes. Process-scoped keys (`%`, `O`, `H`) are
//! set once at startup. Root-scoped keys (`R`, `r`) are overwritten per root
//! argument. Directory- and file-scoped keys are cleared and refilled as the
//! walker moves; the two scope clears remove exactly their own keys.

use std::collections::HashMap;

/// Keys valid only while a file-output line is being emitted.
const FILE_SCOPE: [char; 9] = ['c', 'C', 'T', 'f', 'F', 'n', 'N', 'e', 'E'];

/// Keys valid only while positioned at a directory. `T` is deliberately not
/// here: the running total survives directory changes and is refreshed in
/// place.
const DIR_SCOPE: [char; 7] = ['c', 'C', 'd', 'D', 'p', 'P', 's'];

/// Mutable mapping of template tokens to string values.
#[derive(Debug, Clone)]
pub struct TokenTable {
    map: HashMap<char, String>,
}

impl TokenTable {
    /// Create a table seeded with the literal-percent token, so `%%`
    /// resolves through the ordinary key path.
    pub fn new() -> Self {
        let mut map = HashMap::new();
        map.insert('%', "%".to_string());
        TokenTable { map }
    }

    /// Unconditionally set a token.
    pub fn set(&mut self, key: char, value: impl Into<String>) {
        self.map.insert(key, value.into());
    }

    /// Set a token after backslash-escaping shell-hostile characters.
    ///
    /// Applied wherever filesystem-derived strings (names, paths) enter the
    /// table, so templated output stays usable as shell arguments. Numeric
    /// values go through `set` untouched.
    pub fn set_escaped(&mut self, key: char, value: &str) {
        self.map.insert(key, escape(value));
    }

    pub fn get(&self, key: char) -> Option<&str> {
        self.map.get(&key).map(String::as_str)
    }

    /// Remove the named keys; absent keys are a no-op.
    pub fn clear(&mut self, keys: &[char]) {
        for key in keys {
            self.map.remove(key);
        }
    }

    pub fn clear_file_scope(&mut self) {
        self.clear(&FILE_SCOPE);
    }

    pub fn clear_dir_scope(&mut self) {
        self.clear(&DIR_SCOPE);
    }
}

impl Default for TokenTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Backslash-escape space, parentheses and quotes.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, ' ' | '(' | ')' | '\'' | '"') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

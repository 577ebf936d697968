//! Configuration-file loading: `params`, `head` and `tail` blocks.
//!
//! The format is line oriented. A block opens with `name <` on its own
//! line and closes with `>` on its own line; everything between is taken
//! verbatim. Blank lines and `#` comments are allowed between blocks.
//!
//! ```text
//! # run over image files
//! params <
//! -r -i "jpg jpeg png gif"
//! >
//!
//! head <
//! These are all the image files...
//! >
//! ```

use std::fs;
use std::path::Path;

use crate::error::Error;

/// The raw text of the recognized config blocks.
#[derive(Debug, Clone, Default)]
pub struct ConfigBlocks {
    /// Flag text overriding command-line arguments.
    pub params: Option<String>,
    /// Template block emitted before any traversal output.
    pub head: Option<String>,
    /// Template block emitted after all traversal output.
    pub tail: Option<String>,
}

/// Read and parse a configuration file.
pub fn load(path: &Path) -> Result<ConfigBlocks, Error> {
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_blocks(&text)
}

/// Parse config text into its blocks. Unknown block names are usage
/// errors; a reopened block replaces the earlier one.
pub fn parse_blocks(text: &str) -> Result<ConfigBlocks, Error> {
    let mut blocks = ConfigBlocks::default();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let name = trimmed
            .strip_suffix('<')
            .map(str::trim_end)
            .ok_or_else(|| Error::Config(format!("expected a block header, got '{trimmed}'")))?;

        let mut body = String::new();
        let mut closed = false;
        for body_line in lines.by_ref() {
            if body_line.trim() == ">" {
                closed = true;
                break;
            }
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(body_line);
        }
        if !closed {
            return Err(Error::Config(format!("unterminated block '{name}'")));
        }
        let body = body.trim().to_string();

        match name {
            "params" => blocks.params = Some(body),
            "head" => blocks.head = Some(body),
            "tail" => blocks.tail = Some(body),
            other => return Err(Error::Config(format!("unknown block '{other}'"))),
        }
    }

    Ok(blocks)
}

/// Split a params block into argument tokens, honoring double quotes.
/// Mismatched quotes are a usage error.
pub fn split_args(text: &str) -> Result<Vec<String>, Error> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;

    for ch in text.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                // Remember that this token was quoted so "" survives as
                // an (empty) argument.
                quoted = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() || quoted {
                    tokens.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            c => current.push(c),
        }
    }
    if in_quotes {
        return Err(Error::Config("mismatched quotes in params".into()));
    }
    if !current.is_empty() || quoted {
        tokens.push(current);
    }

    Ok(tokens)
}

//! The template engine: resolves `%x` escapes against a token table.
//!
//! A template is scanned left to right with a cursor. At each `%` the forms
//! are tried in a fixed precedence order: padding directive, `@`-separator
//! form, case-modifier form, plain key. `%%` is the plain-key form looking
//! up the seeded `%` token. The engine never mutates the table.

use crate::error::Error;
use crate::tokens::TokenTable;

/// Tokens that accept the `%u`/`%l` case modifiers.
pub const CASE_KEYS: &str = "rpdDfnNeE";

/// Path-valued tokens that accept the `%@` separator modifier.
pub const SEP_KEYS: &str = "pDf";

/// Counter-valued tokens that accept a pad-width directive. Kept separate
/// from `CASE_KEYS`; the two sets are never cross-checked.
pub const PAD_KEYS: &str = "csCT";

/// Resolve every `%x` escape in `template` to its current value.
///
/// A template containing no `%` is returned unchanged. Any unknown or
/// absent token, disallowed modifier, or trailing `%` is a usage error
/// that aborts the run.
pub fn expand(tokens: &TokenTable, template: &str) -> Result<String, Error> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let mut cursor = rest[pos + 1..].chars();
        let first = cursor.next().ok_or(Error::UnterminatedEscape)?;

        // Padding: %<0|space><2-9><key>. Only taken when the full shape is
        // present; otherwise the lead character falls through and is looked
        // up as a plain key, like any other stray character.
        if first == '0' || first == ' ' {
            let mut lookahead = cursor.clone();
            if let Some(width @ '2'..='9') = lookahead.next() {
                let key = lookahead.next().ok_or(Error::UnterminatedEscape)?;
                let value = tokens.get(key).ok_or(Error::UnknownToken(key))?;
                if !PAD_KEYS.contains(key) {
                    return Err(Error::PadNotSupported(key));
                }
                let want = width as usize - '0' as usize;
                for _ in value.chars().count()..want {
                    out.push(first);
                }
                out.push_str(value);
                rest = lookahead.as_str();
                continue;
            }
        }

        // Separator: %@<p|D|f>, replacing '/' with '@'. A following key
        // outside the set falls through to a plain lookup of '@' (an
        // unknown-token error).
        if first == '@' {
            let mut lookahead = cursor.clone();
            if let Some(key) = lookahead.next() {
                if SEP_KEYS.contains(key) {
                    let value = tokens.get(key).ok_or(Error::UnknownToken(key))?;
                    out.push_str(&value.replace('/', "@"));
                    rest = lookahead.as_str();
                    continue;
                }
            }
        }

        // Case modifier: %u<key> / %l<key> over the allow-set only.
        if first == 'u' || first == 'l' {
            let key = cursor.next().ok_or(Error::UnterminatedEscape)?;
            if !CASE_KEYS.contains(key) {
                return Err(Error::CaseNotSupported(key));
            }
            let value = tokens.get(key).ok_or(Error::UnknownToken(key))?;
            if first == 'u' {
                out.push_str(&value.to_uppercase());
            } else {
                out.push_str(&value.to_lowercase());
            }
            rest = cursor.as_str();
            continue;
        }

        // Plain key, including '%' itself via the seeded literal token.
        let value = tokens.get(first).ok_or(Error::UnknownToken(first))?;
        out.push_str(value);
        rest = cursor.as_str();
    }

    out.push_str(rest);
    Ok(out)
}

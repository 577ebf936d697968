//! Output driver: binds template expansion to a writable stream.

use std::io::Write;

use crate::error::Error;
use crate::template::expand;
use crate::tokens::TokenTable;

/// Expand `template`, turn literal `\n` sequences into real line breaks,
/// and write the result with a trailing line terminator.
///
/// The two-character escape lets a single configured template produce
/// multi-line output.
pub fn emit<W: Write>(out: &mut W, tokens: &TokenTable, template: &str) -> Result<(), Error> {
    let line = expand(tokens, template)?.replace("\\n", "\n");
    writeln!(out, "{line}")?;
    Ok(())
}

/// Expand and write a block of already multi-line text (the bash header
/// and config-file head/tail blocks) without `\n` normalization.
pub fn write_block<W: Write>(
    out: &mut W,
    tokens: &TokenTable,
    block: &str,
) -> Result<(), Error> {
    writeln!(out, "{}", expand(tokens, block)?)?;
    Ok(())
}

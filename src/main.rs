//! CLI entry point for walkfmt

use std::fs::{self, File, OpenOptions};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};
use walkfmt::{ConfigBlocks, Error, ExtFilter, RunConfig, Walker, cfgfile};

/// Header written before all other output in bash-header mode. `%a` holds
/// the invocation arguments.
const BASH_HEADER: &str = "#!/bin/bash\n#\n# walkfmt %a\n#";

/// Color output mode for diagnostics
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum ColorMode {
    /// Auto-detect based on terminal and environment
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Determine whether to use color output based on mode and environment.
fn should_use_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            // Respect NO_COLOR environment variable (https://no-color.org/)
            if std::env::var_os("NO_COLOR").is_some() {
                return false;
            }
            if std::env::var_os("FORCE_COLOR").is_some() {
                return true;
            }
            if std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false) {
                return false;
            }
            std::io::stderr().is_terminal()
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "walkfmt")]
#[command(about = "Walk directory trees and emit templated text for each directory and file")]
#[command(version)]
#[command(after_help = "\
Template tokens:
  %O origin dir      %H home dir        %R root (absolute)  %r root as given
  %P current dir     %p root-prefixed   %D path below root  %d dir name
  %s size            %c files in dir    %C dirs in dir      %T running total
  Per file: %f relative path, %F absolute path, %n name, %N stem,
  %e/%E extension without/with dot; %c/%C/%T refresh per file.
  Modifiers: %u?/%l? upper/lowercase (r p d D f n N e E), %@? separators
  to '@' (p D f), %0N?/% N? pad counters to width N (2-9). %% is literal.
  A literal \\n in a resolved template becomes a line break.")]
struct Args {
    /// Directories to walk
    #[arg(value_name = "DIR")]
    dirs: Vec<String>,

    /// Recurse into subdirectories
    #[arg(short = 'r', long)]
    recursive: bool,

    /// Include hidden files
    #[arg(short = 'F', long = "hidden-files")]
    hidden_files: bool,

    /// Include hidden directories
    #[arg(short = 'D', long = "hidden-dirs")]
    hidden_dirs: bool,

    /// Ignore case when filtering by file extension
    #[arg(short = 'I', long = "ignore-case")]
    ignore_case: bool,

    /// Reverse the enumeration order of directories and files
    #[arg(short = 's', long = "reverse")]
    reverse: bool,

    /// Do not rewrite paths under the home directory to ~/ form
    #[arg(short = 'H', long = "no-homify")]
    no_homify: bool,

    /// Start output with a bash header (an output file is made executable)
    #[arg(short = 'b', long = "bash-header")]
    bash_header: bool,

    /// Write output to FILE instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Only emit files with these extensions (space separated; '-' means
    /// no extension), e.g. "go - txt"
    #[arg(short = 'i', long = "include", value_name = "LIST", conflicts_with = "exclude")]
    include: Option<String>,

    /// Emit all files except those with these extensions
    #[arg(short = 'x', long = "exclude", value_name = "LIST")]
    exclude: Option<String>,

    /// Template emitted per file (default "%f" when no directory template
    /// is given)
    #[arg(short = 'f', long = "file-format", value_name = "TEMPLATE")]
    file_format: Option<String>,

    /// Template emitted per visited directory
    #[arg(short = 'd', long = "dir-format", value_name = "TEMPLATE")]
    dir_format: Option<String>,

    /// Template emitted once before any directory is walked
    #[arg(short = 'L', long = "lead", value_name = "TEMPLATE")]
    lead: Option<String>,

    /// Template emitted once after all directories are walked
    #[arg(short = 'T', long = "tail", value_name = "TEMPLATE")]
    tail: Option<String>,

    /// Template emitted before each DIR argument
    #[arg(short = 'l', long = "root-lead", value_name = "TEMPLATE")]
    root_lead: Option<String>,

    /// Template emitted after each DIR argument
    #[arg(short = 't', long = "root-tail", value_name = "TEMPLATE")]
    root_tail: Option<String>,

    /// Configuration file with params/head/tail blocks
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Value usable as %1..%9 inside config head/tail blocks (repeatable)
    #[arg(short = 'a', long = "arg", value_name = "TEXT")]
    template_args: Vec<String>,

    /// Control color diagnostics: auto, always, never
    #[arg(long = "color", value_name = "WHEN", default_value = "auto")]
    color: ColorMode,
}

fn main() {
    let mut args = Args::parse();
    let use_color = should_use_color(args.color);
    if let Err(e) = run(&mut args, use_color) {
        eprintln!("walkfmt: {e}");
        process::exit(1);
    }
}

fn run(args: &mut Args, use_color: bool) -> Result<(), Error> {
    let mut blocks = ConfigBlocks::default();
    if let Some(path) = args.config.clone() {
        blocks = cfgfile::load(&path)?;
        if let Some(params) = blocks.params.clone() {
            let tokens = cfgfile::split_args(&params)?;
            merge_params(args, &tokens)?;
        }
    }
    if args.template_args.len() > 9 {
        return Err(Error::Config("at most nine --arg values may be given".into()));
    }

    let mut cfg = RunConfig {
        recursive: args.recursive,
        hidden_files: args.hidden_files,
        hidden_dirs: args.hidden_dirs,
        fold_ext_case: args.ignore_case,
        reverse: args.reverse,
        homify: !args.no_homify,
        file_template: args.file_format.clone(),
        dir_template: args.dir_format.clone(),
        lead_template: args.lead.clone(),
        tail_template: args.tail.clone(),
        root_lead_template: args.root_lead.clone(),
        root_tail_template: args.root_tail.clone(),
        // Re-checked here: clap's conflict guard does not see lists
        // merged in from a config file.
        ext_filter: ExtFilter::from_lists(
            args.include.as_deref(),
            args.exclude.as_deref(),
            args.ignore_case,
        )?,
    };
    if cfg.file_template.is_none() && cfg.dir_template.is_none() {
        cfg.file_template = Some("%f".to_string());
    }

    let out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(open_output(path, args.bash_header)?),
        None => Box::new(io::stdout().lock()),
    };
    let mut walker = Walker::new(&cfg, out, use_color);

    if args.bash_header {
        walker
            .tokens_mut()
            .set('a', invocation_args(blocks.params.as_deref()));
        walker.write_block(BASH_HEADER)?;
        walker.tokens_mut().clear(&['a']);
    }
    if let Some(head) = &blocks.head {
        emit_numbered(&mut walker, &args.template_args, head)?;
    }

    let dirs: Vec<String> = if args.dirs.is_empty() {
        vec![".".to_string()]
    } else {
        args.dirs.clone()
    };
    walker.run(&dirs)?;

    if let Some(tail) = &blocks.tail {
        emit_numbered(&mut walker, &args.template_args, tail)?;
    }
    Ok(())
}

/// Apply config-file `params` tokens on top of the parsed command line.
/// Params override flags; `-c` and `-a` may not appear inside params.
fn merge_params(args: &mut Args, tokens: &[String]) -> Result<(), Error> {
    let mut it = tokens.iter();
    while let Some(token) = it.next() {
        let flag = token
            .strip_prefix("--")
            .or_else(|| token.strip_prefix('-'))
            .ok_or_else(|| Error::Config(format!("expected a flag in params, got '{token}'")))?;

        let mut take = |name: &str| -> Result<String, Error> {
            it.next()
                .cloned()
                .ok_or_else(|| Error::Config(format!("missing value for '{name}' in params")))
        };

        match flag {
            "r" | "recursive" => args.recursive = true,
            "F" | "hidden-files" => args.hidden_files = true,
            "D" | "hidden-dirs" => args.hidden_dirs = true,
            "I" | "ignore-case" => args.ignore_case = true,
            "s" | "reverse" => args.reverse = true,
            "H" | "no-homify" => args.no_homify = true,
            "b" | "bash-header" => args.bash_header = true,
            "o" | "output" => args.output = Some(PathBuf::from(take("-o")?)),
            "i" | "include" => args.include = Some(take("-i")?),
            "x" | "exclude" => args.exclude = Some(take("-x")?),
            "f" | "file-format" => args.file_format = Some(take("-f")?),
            "d" | "dir-format" => args.dir_format = Some(take("-d")?),
            "L" | "lead" => args.lead = Some(take("-L")?),
            "T" | "tail" => args.tail = Some(take("-T")?),
            "l" | "root-lead" => args.root_lead = Some(take("-l")?),
            "t" | "root-tail" => args.root_tail = Some(take("-t")?),
            "c" | "config" | "a" | "arg" => {
                return Err(Error::Config(format!(
                    "cannot use '-{flag}' inside config params"
                )));
            }
            other => {
                return Err(Error::Config(format!("unknown flag '-{other}' in params")));
            }
        }
    }
    Ok(())
}

/// Emit a config head/tail block with `%1`..`%9` bound to the `--arg`
/// values, clearing them again afterwards.
fn emit_numbered<W: Write>(
    walker: &mut Walker<'_, W>,
    values: &[String],
    block: &str,
) -> Result<(), Error> {
    for (i, value) in values.iter().enumerate() {
        walker.tokens_mut().set((b'1' + i as u8) as char, value.clone());
    }
    let result = walker.write_block(block);
    walker
        .tokens_mut()
        .clear(&['1', '2', '3', '4', '5', '6', '7', '8', '9']);
    result
}

/// Replace any existing output file and create it writable, executable
/// when the bash header was requested.
fn open_output(path: &Path, executable: bool) -> Result<File, Error> {
    let _ = fs::remove_file(path);
    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(if executable { 0o755 } else { 0o644 });
    }
    opts.open(path).map_err(|e| Error::io(path, e))
}

/// Reassemble the invocation arguments for the `%a` token, quoting any
/// that contain whitespace and appending config params when present.
fn invocation_args(params: Option<&str>) -> String {
    let mut out = String::from(" ");
    for arg in std::env::args().skip(1) {
        if arg.contains(char::is_whitespace) {
            out.push('"');
            out.push_str(&arg);
            out.push('"');
        } else {
            out.push_str(&arg);
        }
        out.push(' ');
    }
    if let Some(params) = params {
        out.push_str("( ");
        out.push_str(params);
        out.push_str(" )");
    }
    out
}

//! The traversal engine: a recursive, depth-first directory walk that
//! fills the token table and drives the output templates.
//!
//! The walker owns all mutable run state (token table, counters, output
//! stream, diagnostics); configuration is immutable and passed in at
//! construction. Soft filesystem failures never cross a directory
//! boundary upward; hard failures unwind the whole run.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::diag::Diag;
use crate::error::{Error, FsOutcome, classify};
use crate::output::{emit, write_block};
use crate::paths;
use crate::tokens::TokenTable;

/// Per-root-argument context, fixed for the duration of one walk.
struct RootCtx {
    /// Absolute form of the root argument.
    abs: PathBuf,
    /// The argument as given (cleaned, homified); prefix for the `p` token.
    given: String,
}

pub struct Walker<'cfg, W: Write> {
    cfg: &'cfg RunConfig,
    tokens: TokenTable,
    diag: Diag,
    out: W,
    home: Option<String>,
    /// Files emitted under the current root argument.
    root_files: u64,
    /// Files counted over the whole run; never reset.
    total_files: u64,
}

impl<'cfg, W: Write> Walker<'cfg, W> {
    pub fn new(cfg: &'cfg RunConfig, out: W, use_color: bool) -> Self {
        let mut walker = Walker {
            cfg,
            tokens: TokenTable::new(),
            diag: Diag::stderr(use_color),
            out,
            home: std::env::var("HOME").ok().filter(|h| !h.is_empty()),
            root_files: 0,
            total_files: 0,
        };
        if let Some(home) = walker.home.clone() {
            walker.tokens.set_escaped('H', &home);
        }
        let origin = paths::absolutize(Path::new("."));
        let origin = walker.homify(&origin.to_string_lossy());
        walker.tokens.set_escaped('O', &origin);
        walker
    }

    /// The token table, exposed for the CLI glue (bash header and config
    /// head/tail blocks bind their own short-lived tokens).
    pub fn tokens_mut(&mut self) -> &mut TokenTable {
        &mut self.tokens
    }

    /// Expand and write a multi-line block (no `\n` normalization).
    pub fn write_block(&mut self, block: &str) -> Result<(), Error> {
        write_block(&mut self.out, &self.tokens, block)
    }

    /// Global total of files counted so far.
    pub fn total_files(&self) -> u64 {
        self.total_files
    }

    /// Consume the walker, returning the output stream.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Process every root argument in sequence, wrapped by the global
    /// lead/tail templates.
    pub fn run(&mut self, roots: &[String]) -> Result<(), Error> {
        let cfg = self.cfg;
        if let Some(t) = &cfg.lead_template {
            self.emit_line(t)?;
        }
        for root in roots {
            self.process_root(root)?;
        }
        if let Some(t) = &cfg.tail_template {
            self.tokens.clear_file_scope();
            self.tokens.clear_dir_scope();
            self.tokens.set('T', self.total_files.to_string());
            self.emit_line(t)?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn emit_line(&mut self, template: &str) -> Result<(), Error> {
        emit(&mut self.out, &self.tokens, template)
    }

    fn homify(&self, path: &str) -> String {
        if self.cfg.homify {
            paths::homify(self.home.as_deref(), path)
        } else {
            path.to_string()
        }
    }

    fn process_root(&mut self, arg: &str) -> Result<(), Error> {
        let cfg = self.cfg;
        let given = paths::clean_arg(arg);
        let abs = paths::absolutize(Path::new(&given));

        let abs_display = self.homify(&abs.to_string_lossy());
        let given_display = self.homify(&given);
        self.tokens.set_escaped('R', &abs_display);
        self.tokens.set_escaped('r', &given_display);
        self.root_files = 0;

        if let Some(t) = &cfg.root_lead_template {
            self.tokens.clear_file_scope();
            self.tokens.clear_dir_scope();
            self.emit_line(t)?;
        }

        let root = RootCtx {
            abs,
            given: given_display,
        };
        self.visit_dir(&root, ".", ".")?;

        if let Some(t) = &cfg.root_tail_template {
            self.tokens.clear_file_scope();
            self.tokens.clear_dir_scope();
            self.tokens.set('T', self.total_files.to_string());
            self.emit_line(t)?;
        }
        Ok(())
    }

    /// Visit one directory: stat it, list and partition its children,
    /// fill the directory-scoped tokens, emit the configured lines, and
    /// recurse (or list immediate children when recursion is off).
    fn visit_dir(&mut self, root: &RootCtx, parent_rel: &str, name: &str) -> Result<(), Error> {
        let cfg = self.cfg;
        let rel = paths::join_rel(parent_rel, name);
        let abs = if rel == "." {
            root.abs.clone()
        } else {
            root.abs.join(&rel)
        };

        let meta = match fs::metadata(&abs) {
            Ok(m) => m,
            Err(e) => return self.soft_dir_error(&abs, e),
        };

        let (mut subdirs, mut files) = self.list_children(&abs)?;
        if cfg.reverse {
            subdirs.reverse();
        }

        self.tokens.clear_file_scope();
        let abs_display = self.homify(&abs.to_string_lossy());
        let cur_path = paths::join_rel(&root.given, &rel);
        self.tokens.set_escaped('P', &abs_display);
        self.tokens.set_escaped('p', &cur_path);
        self.tokens.set_escaped('D', &rel);
        self.tokens.set_escaped('d', name);
        self.tokens.set('s', meta.len().to_string());
        self.tokens.set('c', files.len().to_string());
        self.tokens.set('C', subdirs.len().to_string());
        self.tokens.set('T', self.total_files.to_string());

        if let Some(t) = &cfg.dir_template {
            self.emit_line(t)?;
        }

        if let Some(t) = &cfg.file_template {
            if cfg.reverse {
                files.reverse();
            }
            self.emit_files(&abs, &rel, t, &files)?;
        } else {
            // Totals stay consistent whether or not file lines print.
            self.total_files += files.len() as u64;
        }

        for sub in &subdirs {
            if cfg.recursive {
                self.visit_dir(root, &rel, sub)?;
            } else if let Some(t) = &cfg.dir_template {
                self.emit_child_dir_line(&abs, sub, t)?;
            }
        }
        Ok(())
    }

    /// List a directory, partitioning entries into kept subdirectories
    /// and kept regular files. Enumeration order is the OS order; no
    /// sorting is applied.
    fn list_children(&mut self, abs: &Path) -> Result<(Vec<String>, Vec<String>), Error> {
        let cfg = self.cfg;
        let mut subdirs = Vec::new();
        let mut files = Vec::new();

        let entries = match fs::read_dir(abs) {
            Ok(entries) => entries,
            Err(e) => {
                return match classify(&e) {
                    FsOutcome::PermissionDenied => {
                        self.diag.warn(&format!(
                            "cannot list restricted directory `{}`",
                            abs.display()
                        ));
                        Ok((subdirs, files))
                    }
                    _ => Err(Error::io(abs, e)),
                };
            }
        };

        for entry in entries {
            let entry = entry.map_err(|e| Error::io(abs, e))?;
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            let Ok(ftype) = entry.file_type() else {
                // Entry vanished between listing and typing.
                continue;
            };
            if ftype.is_dir() {
                // Single-character dot names are never produced by the
                // enumeration, so the length guard only spares names
                // like "." if a platform ever yields them.
                if !cfg.hidden_dirs && name.len() > 1 && name.starts_with('.') {
                    continue;
                }
                subdirs.push(name.into_owned());
            } else if ftype.is_file() {
                if !cfg.hidden_files && name.starts_with('.') {
                    continue;
                }
                if let Some(filter) = &cfg.ext_filter {
                    if !filter.admits(&filter_ext(&name, cfg.fold_ext_case)) {
                        continue;
                    }
                }
                files.push(name.into_owned());
            }
            // Symlinks, fifos and sockets are not regular files; skipped.
        }

        Ok((subdirs, files))
    }

    /// Emit one line per filtered file, refreshing the file-scoped tokens
    /// and the three counters for each.
    fn emit_files(
        &mut self,
        dir_abs: &Path,
        dir_rel: &str,
        template: &str,
        files: &[String],
    ) -> Result<(), Error> {
        let mut dir_count: u64 = 0;
        for name in files {
            let path = dir_abs.join(name);
            let meta = match fs::metadata(&path) {
                Ok(m) => m,
                Err(e) => match classify(&e) {
                    FsOutcome::NotFound => continue,
                    FsOutcome::PermissionDenied => {
                        self.diag.warn(&format!(
                            "cannot stat restricted file `{}`",
                            path.display()
                        ));
                        continue;
                    }
                    FsOutcome::Other => return Err(Error::io(path, e)),
                },
            };

            let (stem, ext) = paths::split_name(name);
            self.tokens.set_escaped('n', name);
            self.tokens.set_escaped('N', &stem);
            match &ext {
                Some(ext) => {
                    self.tokens.set_escaped('E', &format!(".{ext}"));
                    self.tokens.set_escaped('e', ext);
                }
                None => {
                    self.tokens.set('E', "");
                    self.tokens.set('e', "");
                }
            }

            dir_count += 1;
            self.root_files += 1;
            self.total_files += 1;
            self.tokens.set('c', dir_count.to_string());
            self.tokens.set('C', self.root_files.to_string());
            self.tokens.set('T', self.total_files.to_string());
            self.tokens.set('s', meta.len().to_string());

            let abs_display = self.homify(&path.to_string_lossy());
            self.tokens.set_escaped('F', &abs_display);
            self.tokens.set_escaped('f', &paths::join_rel(dir_rel, name));

            self.emit_line(template)?;
        }
        Ok(())
    }

    /// Non-recursive mode still reports one line per immediate
    /// subdirectory; only `P`, `d` and `s` are refreshed for it.
    fn emit_child_dir_line(
        &mut self,
        parent_abs: &Path,
        name: &str,
        template: &str,
    ) -> Result<(), Error> {
        let child = parent_abs.join(name);
        let meta = match fs::metadata(&child) {
            Ok(m) => m,
            Err(e) => return self.soft_dir_error(&child, e),
        };
        let child_display = self.homify(&child.to_string_lossy());
        self.tokens.set('s', meta.len().to_string());
        self.tokens.set_escaped('P', &child_display);
        self.tokens.set_escaped('d', name);
        self.emit_line(template)
    }

    /// Directory stat policy: not-found and permission problems abandon
    /// the subtree with a warning; anything else aborts the run.
    fn soft_dir_error(&mut self, path: &Path, err: io::Error) -> Result<(), Error> {
        match classify(&err) {
            FsOutcome::NotFound => {
                self.diag
                    .warn(&format!("cannot stat directory `{}`", path.display()));
                Ok(())
            }
            FsOutcome::PermissionDenied => {
                self.diag.warn(&format!(
                    "cannot open restricted directory `{}`",
                    path.display()
                ));
                Ok(())
            }
            FsOutcome::Other => Err(Error::io(path, err)),
        }
    }
}

/// Extension as seen by the filter: `-` for dotless names, case-folded
/// when requested.
fn filter_ext(name: &str, fold: bool) -> String {
    match Path::new(name).extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy();
            if fold {
                ext.to_lowercase()
            } else {
                ext.into_owned()
            }
        }
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtFilter;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn run(cfg: &RunConfig, roots: &[&str]) -> String {
        let mut walker = Walker::new(cfg, Vec::new(), false);
        let roots: Vec<String> = roots.iter().map(|r| r.to_string()).collect();
        walker.run(&roots).unwrap();
        String::from_utf8(walker.into_inner()).unwrap()
    }

    #[test]
    fn test_filter_ext() {
        assert_eq!(filter_ext("a.TXT", false), "TXT");
        assert_eq!(filter_ext("a.TXT", true), "txt");
        assert_eq!(filter_ext("README", false), "-");
        assert_eq!(filter_ext(".bashrc", false), "-");
    }

    #[test]
    fn test_include_filter_scenario() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.txt", "a");
        write_file(dir.path(), "b.log", "b");
        write_file(dir.path(), "sub/c.txt", "c");

        let cfg = RunConfig {
            recursive: true,
            file_template: Some("%f".into()),
            ext_filter: ExtFilter::from_lists(Some("txt"), None, false).unwrap(),
            ..Default::default()
        };
        let out = run(&cfg, &[dir.path().to_str().unwrap()]);
        assert_eq!(out, "a.txt\nsub/c.txt\n");
    }

    #[test]
    fn test_no_extension_marker_filter() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "README", "readme");
        write_file(dir.path(), "notes.txt", "notes");

        let cfg = RunConfig {
            file_template: Some("%f".into()),
            ext_filter: ExtFilter::from_lists(Some("-"), None, false).unwrap(),
            ..Default::default()
        };
        let out = run(&cfg, &[dir.path().to_str().unwrap()]);
        assert_eq!(out, "README\n");
    }

    #[test]
    fn test_exclude_filter() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "keep.txt", "k");
        write_file(dir.path(), "drop.log", "d");

        let cfg = RunConfig {
            file_template: Some("%f".into()),
            ext_filter: ExtFilter::from_lists(None, Some("log"), false).unwrap(),
            ..Default::default()
        };
        let out = run(&cfg, &[dir.path().to_str().unwrap()]);
        assert_eq!(out, "keep.txt\n");
    }

    #[test]
    fn test_case_insensitive_filter() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "photo.JPG", "x");

        let strict = RunConfig {
            file_template: Some("%f".into()),
            ext_filter: ExtFilter::from_lists(Some("jpg"), None, false).unwrap(),
            ..Default::default()
        };
        assert_eq!(run(&strict, &[dir.path().to_str().unwrap()]), "");

        let folded = RunConfig {
            file_template: Some("%f".into()),
            fold_ext_case: true,
            ext_filter: ExtFilter::from_lists(Some("JPG"), None, true).unwrap(),
            ..Default::default()
        };
        assert_eq!(
            run(&folded, &[dir.path().to_str().unwrap()]),
            "photo.JPG\n"
        );
    }

    #[test]
    fn test_two_roots_counters() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "dirA/one.txt", "1");
        write_file(dir.path(), "dirB/two.txt", "2");

        let cfg = RunConfig {
            file_template: Some("%n C=%C T=%T".into()),
            tail_template: Some("total=%T".into()),
            ..Default::default()
        };
        let root_a = dir.path().join("dirA");
        let root_b = dir.path().join("dirB");
        let out = run(
            &cfg,
            &[root_a.to_str().unwrap(), root_b.to_str().unwrap()],
        );
        assert_eq!(out, "one.txt C=1 T=1\ntwo.txt C=1 T=2\ntotal=2\n");
    }

    #[test]
    fn test_total_advances_without_file_template() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.txt", "a");
        write_file(dir.path(), "b.txt", "b");
        write_file(dir.path(), "c.txt", "c");

        let cfg = RunConfig {
            dir_template: Some("files=%c".into()),
            tail_template: Some("total=%T".into()),
            ..Default::default()
        };
        let out = run(&cfg, &[dir.path().to_str().unwrap()]);
        assert_eq!(out, "files=3\ntotal=3\n");
    }

    #[test]
    fn test_reverse_inverts_file_order() {
        let dir = TempDir::new().unwrap();
        for name in ["a.txt", "b.txt", "c.txt", "d.txt"] {
            write_file(dir.path(), name, name);
        }

        let forward_cfg = RunConfig {
            file_template: Some("%n".into()),
            ..Default::default()
        };
        let reverse_cfg = RunConfig {
            file_template: Some("%n".into()),
            reverse: true,
            ..Default::default()
        };
        let root = dir.path().to_str().unwrap().to_string();
        let forward: Vec<String> = run(&forward_cfg, &[&root])
            .lines()
            .map(str::to_string)
            .collect();
        let reversed: Vec<String> = run(&reverse_cfg, &[&root])
            .lines()
            .map(str::to_string)
            .collect();

        let mut expected = forward.clone();
        expected.reverse();
        assert_eq!(reversed, expected);
        assert_eq!(forward.len(), 4);
    }

    #[test]
    fn test_hidden_entries_filtered_by_default() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "seen.txt", "s");
        write_file(dir.path(), ".hidden.txt", "h");
        write_file(dir.path(), ".hiddendir/inner.txt", "i");

        let cfg = RunConfig {
            recursive: true,
            file_template: Some("%f".into()),
            ..Default::default()
        };
        let out = run(&cfg, &[dir.path().to_str().unwrap()]);
        assert_eq!(out, "seen.txt\n");

        let cfg_all = RunConfig {
            recursive: true,
            hidden_files: true,
            hidden_dirs: true,
            file_template: Some("%f".into()),
            ..Default::default()
        };
        let out_all = run(&cfg_all, &[dir.path().to_str().unwrap()]);
        assert!(out_all.contains("seen.txt\n"));
        assert!(out_all.contains(".hidden.txt\n"));
        assert!(out_all.contains(".hiddendir/inner.txt\n"));
    }

    #[test]
    fn test_idempotent_over_unchanged_tree() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.txt", "a");
        write_file(dir.path(), "sub/b.txt", "b");
        write_file(dir.path(), "sub/deep/c.txt", "c");

        let cfg = RunConfig {
            recursive: true,
            dir_template: Some("dir %D (%c files, %C dirs)".into()),
            file_template: Some("%f %s".into()),
            ..Default::default()
        };
        let root = dir.path().to_str().unwrap().to_string();
        let first = run(&cfg, &[&root]);
        let second = run(&cfg, &[&root]);
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_directory_tokens() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "top.txt", "t");
        write_file(dir.path(), "sub/inner.txt", "i");

        let cfg = RunConfig {
            recursive: true,
            dir_template: Some("d=%d D=%D c=%c C=%C".into()),
            ..Default::default()
        };
        let out = run(&cfg, &[dir.path().to_str().unwrap()]);
        assert_eq!(out, "d=. D=. c=1 C=1\nd=sub D=sub c=1 C=0\n");
    }

    #[test]
    fn test_non_recursive_lists_immediate_subdirs() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "sub/inner.txt", "i");
        write_file(dir.path(), "sub/deep/far.txt", "f");

        let cfg = RunConfig {
            dir_template: Some("%d".into()),
            ..Default::default()
        };
        let out = run(&cfg, &[dir.path().to_str().unwrap()]);
        // Root line, then one line for the immediate child; no descent.
        assert_eq!(out, ".\nsub\n");
    }

    #[test]
    fn test_file_tokens() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "sub/File.Ext", "12345");

        let cfg = RunConfig {
            recursive: true,
            file_template: Some("n=%n N=%N e=%e E=%E s=%s f=%f".into()),
            ..Default::default()
        };
        let out = run(&cfg, &[dir.path().to_str().unwrap()]);
        assert_eq!(out, "n=File.Ext N=File e=Ext E=.Ext s=5 f=sub/File.Ext\n");
    }

    #[test]
    fn test_shell_escaping_in_emitted_paths() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "my file.txt", "x");

        let cfg = RunConfig {
            file_template: Some("%f".into()),
            ..Default::default()
        };
        let out = run(&cfg, &[dir.path().to_str().unwrap()]);
        assert_eq!(out, "my\\ file.txt\n");
    }

    #[test]
    fn test_missing_root_is_soft() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        let cfg = RunConfig {
            file_template: Some("%f".into()),
            ..Default::default()
        };
        let out = run(&cfg, &[missing.to_str().unwrap()]);
        assert_eq!(out, "", "missing root warns and produces no output");
    }

    #[test]
    fn test_root_lead_and_tail() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.txt", "a");

        let cfg = RunConfig {
            file_template: Some("%f".into()),
            root_lead_template: Some("# start %r".into()),
            root_tail_template: Some("# done %r (%T so far)".into()),
            ..Default::default()
        };
        let root = dir.path().to_str().unwrap();
        let out = run(&cfg, &[root]);
        let escaped_root = root.replace(' ', "\\ ");
        assert_eq!(
            out,
            format!(
                "# start {0}\na.txt\n# done {0} (1 so far)\n",
                escaped_root
            )
        );
    }

    #[test]
    fn test_unknown_token_in_template_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.txt", "a");

        let cfg = RunConfig {
            file_template: Some("%f %q".into()),
            ..Default::default()
        };
        let mut walker = Walker::new(&cfg, Vec::new(), false);
        let err = walker
            .run(&[dir.path().to_str().unwrap().to_string()])
            .unwrap_err();
        assert!(matches!(err, Error::UnknownToken('q')));
    }

    #[test]
    fn test_file_scoped_tokens_unavailable_in_dir_only_mode() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.txt", "a");

        // %n is file-scoped; a directory template may not use it.
        let cfg = RunConfig {
            dir_template: Some("%n".into()),
            ..Default::default()
        };
        let mut walker = Walker::new(&cfg, Vec::new(), false);
        let err = walker
            .run(&[dir.path().to_str().unwrap().to_string()])
            .unwrap_err();
        assert!(matches!(err, Error::UnknownToken('n')));
    }
}

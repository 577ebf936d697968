//! Run configuration: the immutable settings handed to the walker.

use crate::error::Error;

/// Extension filter: at most one of an inclusive or exclusive
/// space-delimited list is active per run. The entry `-` matches files
/// with no extension.
#[derive(Debug, Clone)]
pub enum ExtFilter {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl ExtFilter {
    /// Build the filter from the raw include/exclude lists. Configuring
    /// both is a usage error (clap catches the flag form; this catches
    /// lists merged in from a config file). When `fold_case` is set the
    /// list entries are lowercased here and observed extensions are
    /// lowercased at match time.
    pub fn from_lists(
        include: Option<&str>,
        exclude: Option<&str>,
        fold_case: bool,
    ) -> Result<Option<Self>, Error> {
        let split = |list: &str| -> Vec<String> {
            list.split_whitespace()
                .map(|ext| {
                    if fold_case {
                        ext.to_lowercase()
                    } else {
                        ext.to_string()
                    }
                })
                .collect()
        };
        match (include, exclude) {
            (Some(_), Some(_)) => Err(Error::ConflictingFilters),
            (Some(list), None) => Ok(Some(ExtFilter::Include(split(list)))),
            (None, Some(list)) => Ok(Some(ExtFilter::Exclude(split(list)))),
            (None, None) => Ok(None),
        }
    }

    /// Whether a file with the given extension passes the filter.
    /// `ext` is `-` for files without an extension and must already be
    /// case-folded when folding is enabled.
    pub fn admits(&self, ext: &str) -> bool {
        match self {
            ExtFilter::Include(list) => list.iter().any(|e| e == ext),
            ExtFilter::Exclude(list) => !list.iter().any(|e| e == ext),
        }
    }
}

/// Immutable per-run configuration for the traversal engine.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Include files whose name starts with '.'.
    pub hidden_files: bool,
    /// Include directories whose name starts with '.'.
    pub hidden_dirs: bool,
    /// Case-fold extensions before filtering.
    pub fold_ext_case: bool,
    /// Invert the enumeration order of directories and files.
    pub reverse: bool,
    /// Rewrite paths under the home directory to `~/` form.
    pub homify: bool,
    /// Template emitted once per file.
    pub file_template: Option<String>,
    /// Template emitted once per visited directory.
    pub dir_template: Option<String>,
    /// Template emitted once before the first root argument.
    pub lead_template: Option<String>,
    /// Template emitted once after the last root argument.
    pub tail_template: Option<String>,
    /// Template emitted before each root argument's walk.
    pub root_lead_template: Option<String>,
    /// Template emitted after each root argument's walk.
    pub root_tail_template: Option<String>,
    pub ext_filter: Option<ExtFilter>,
}

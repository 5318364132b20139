//! File discovery with comprehensive filtering.
//!
//! [`walk`] traverses a root directory and returns the sorted list of files
//! worth indexing. A file is included only if its (lowercased) extension is
//! in [`INCLUDED_EXTENSIONS`], it is not hidden, it does not match any
//! excluded file glob, it is not larger than the size cap, and no directory
//! on its path below the root is excluded.
//!
//! Excluded directories are pruned during the walk, so their subtrees are
//! never descended. Errors accessing individual entries are logged to stderr
//! and skipped; they never abort the walk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::{DirEntry, WalkDir};

/// File extensions eligible for indexing (lowercased, with leading dot).
pub const INCLUDED_EXTENSIONS: &[&str] = &[
    // Programming languages
    ".go", ".py", ".js", ".jsx", ".ts", ".tsx", ".java", ".c", ".cpp", ".cc",
    ".cxx", ".h", ".hpp", ".hxx", ".cs", ".php", ".rb", ".rs", ".swift",
    ".kt", ".scala", ".pl", ".pm", ".r", ".lua", ".groovy", ".dart", ".elm",
    ".ex", ".exs", ".erl", ".hrl", ".clj", ".hs", ".fs", ".fsx", ".ml",
    ".mli",
    // Shell scripts
    ".sh", ".bash", ".zsh", ".fish", ".ps1", ".bat", ".cmd",
    // Web development
    ".html", ".htm", ".xhtml", ".css", ".scss", ".sass", ".less", ".vue",
    ".svelte",
    // Data and config files
    ".json", ".yaml", ".yml", ".xml", ".toml", ".ini", ".sql", ".graphql",
    ".proto",
    // Documentation
    ".md", ".rst", ".tex", ".adoc",
];

/// Directory basenames that are pruned wherever they appear below the root.
const EXCLUDED_DIRS: &[&str] = &[
    // Package managers and dependencies
    "node_modules", "vendor", "bower_components", "jspm_packages", "packages",
    // Version control
    ".git", ".svn", ".hg", ".bzr",
    // Virtual environments
    ".venv", "venv", "env", ".env", "virtualenv", "__pycache__",
    "site-packages",
    // Build and distribution
    "dist", "build", "out", "bin", "target", "output", "release", "debug",
    // IDE and editor
    ".idea", ".vscode", ".vs", ".eclipse", ".settings",
    // Temporary and cache
    "tmp", "temp", "cache", ".cache", ".sass-cache",
    // Documentation
    "docs", "doc",
    // Test coverage
    "coverage", ".nyc_output", ".coverage", "htmlcov",
    // Logs
    "logs", "log",
];

/// File basename patterns that are never indexed.
const EXCLUDED_FILE_GLOBS: &[&str] = &[
    // Minified files
    "*.min.js", "*.min.css",
    // Generated files
    "*.generated.*", "*_generated.*", "*.g.*", "*.pb.*",
    // Compiled binaries
    "*.exe", "*.dll", "*.so", "*.dylib", "*.class", "*.o", "*.obj", "*.a",
    "*.lib", "*.pyc", "*.pyo",
    // Archives
    "*.zip", "*.tar", "*.gz", "*.bz2", "*.xz", "*.rar", "*.7z",
    // Media files
    "*.jpg", "*.jpeg", "*.png", "*.gif", "*.bmp", "*.ico", "*.svg", "*.webp",
    "*.mp3", "*.mp4", "*.wav", "*.avi", "*.mov", "*.webm",
    // Lock files
    "*.lock", "package-lock.json", "yarn.lock", "Cargo.lock",
    // Backup files
    "*~", "*.bak", "*.swp", "*.swo",
    // Large data files
    "*.csv", "*.tsv", "*.db", "*.sqlite", "*.sqlite3",
    // Logs
    "*.log",
];

static EXTENSION_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| INCLUDED_EXTENSIONS.iter().copied().collect());

static EXCLUDED_DIR_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| EXCLUDED_DIRS.iter().copied().collect());

static EXCLUDED_FILES: LazyLock<GlobSet> = LazyLock::new(|| {
    let mut builder = GlobSetBuilder::new();
    for pattern in EXCLUDED_FILE_GLOBS {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
});

/// Recursively find all indexable files under `root`.
///
/// Returns absolute paths in sorted order so two walks over the same tree
/// are byte-identical. Access errors on individual entries are logged and
/// skipped.
pub fn walk(root: &Path, max_file_size: u64) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !prune_dir(entry));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                eprintln!("Warning: error accessing path: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => continue,
        };

        // Hidden files
        if name.starts_with('.') {
            continue;
        }

        // Excluded basename patterns
        if EXCLUDED_FILES.is_match(name) {
            continue;
        }

        // Extension allow-list
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(e) => format!(".{}", e.to_lowercase()),
            None => continue,
        };
        if !EXTENSION_SET.contains(ext.as_str()) {
            continue;
        }

        // Size cap
        match entry.metadata() {
            Ok(meta) if meta.len() > max_file_size => continue,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Warning: error reading metadata for {}: {}", path.display(), e);
                continue;
            }
        }

        // Excluded path components below the root
        if excluded_below_root(path, root) {
            continue;
        }

        files.push(path.to_path_buf());
    }

    files.sort();
    files
}

/// Directory pruning: hidden directories, excluded basenames, and Python
/// virtual-environment layouts are skipped without descending.
fn prune_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }

    let name = match entry.file_name().to_str() {
        Some(n) => n,
        None => return false,
    };

    if name.starts_with('.') && name != "." && name != ".." {
        return true;
    }

    if EXCLUDED_DIR_SET.contains(name) {
        return true;
    }

    let path = entry.path().to_string_lossy();
    if (path.contains("venv/lib/python") || path.contains("env/lib/python"))
        && path.contains("site-packages")
    {
        return true;
    }

    false
}

/// True if any directory component of `path` below `root` is excluded.
fn excluded_below_root(path: &Path, root: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let rel_str = relative.to_string_lossy();

    if (rel_str.contains("venv/lib/python") || rel_str.contains("env/lib/python"))
        && rel_str.contains("site-packages")
    {
        return true;
    }

    let Some(parent) = relative.parent() else {
        return false;
    };
    parent.components().any(|c| {
        c.as_os_str()
            .to_str()
            .is_some_and(|s| EXCLUDED_DIR_SET.contains(s))
    })
}

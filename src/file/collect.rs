//! Source-file collection with directory, extension, and size filters.

use std::path::{Path, PathBuf};

use crate::{
   Result, config,
   file::FileService,
};

/// Directory base names never descended into.
const BLOCKED_DIRS: &[&str] = &[
   "node_modules",
   ".git",
   ".next",
   "dist",
   "build",
   "out",
   "coverage",
   ".cache",
   "vendor",
   "target",
   "__pycache__",
   ".pytest_cache",
   ".venv",
   "venv",
];

/// Extensions rejected as binary or noise before the allow check.
const BLOCKED_EXTENSIONS: &[&str] = &[
   ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".webp", ".mp4", ".mov", ".avi", ".mkv",
   ".mp3", ".wav", ".ogg", ".zip", ".tar", ".gz", ".rar", ".7z", ".pdf", ".doc", ".docx", ".exe",
   ".dll", ".so", ".dylib", ".lock", ".log", ".min.js", ".min.css", ".map",
];

/// Extensions accepted for ingestion.
const CODE_EXTENSIONS: &[&str] = &[
   ".js", ".jsx", ".ts", ".tsx", ".py", ".java", ".cpp", ".c", ".h", ".hpp", ".cs", ".go", ".rs",
   ".rb", ".php", ".swift", ".kt", ".scala", ".sh", ".sql", ".html", ".css", ".scss", ".json",
   ".yaml", ".yml", ".xml", ".md", ".txt",
];

/// One file selected for ingestion. `rel_path` is relative to the
/// collection root, forward-slash separated, with no leading slash.
#[derive(Debug, Clone)]
pub struct CollectedFile {
   pub rel_path:    String,
   pub abs_path:    PathBuf,
   pub size:        u64,
   pub modified_ms: Option<i64>,
}

/// Walks `root` depth-first through the file service and returns every
/// file eligible for ingestion. Unreadable entries are logged and skipped,
/// never fatal.
pub async fn collect_files<F: FileService>(fs: &F, root: &Path) -> Result<Vec<CollectedFile>> {
   let mut files = Vec::new();
   let mut pending = vec![root.to_path_buf()];

   while let Some(path) = pending.pop() {
      let stat = match fs.stat(&path).await {
         Ok(stat) => stat,
         Err(e) => {
            tracing::warn!("skipping unreadable entry {}: {}", path.display(), e);
            continue;
         },
      };

      let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

      if stat.is_directory {
         if path != root && is_blocked_dir(name) {
            continue;
         }
         pending.extend(stat.children);
      } else if stat.is_file && should_include(name, stat.size) {
         let Some(rel_path) = relative_key(root, &path) else {
            tracing::warn!("skipping path outside root or non-utf8: {}", path.display());
            continue;
         };
         files.push(CollectedFile {
            rel_path,
            abs_path: path,
            size: stat.size,
            modified_ms: stat.modified_ms,
         });
      }
   }

   Ok(files)
}

fn is_blocked_dir(name: &str) -> bool {
   BLOCKED_DIRS.contains(&name)
}

/// Lowercased dotted extension, from the last `.` onward.
fn file_extension(name: &str) -> Option<String> {
   name.rfind('.').map(|idx| name[idx..].to_lowercase())
}

fn should_include(name: &str, size: u64) -> bool {
   let Some(ext) = file_extension(name) else {
      return false;
   };
   if BLOCKED_EXTENSIONS.contains(&ext.as_str()) {
      return false;
   }
   if !CODE_EXTENSIONS.contains(&ext.as_str()) {
      return false;
   }
   size <= config::get().effective_max_file_size_bytes()
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
   let relative = path.strip_prefix(root).ok()?;
   let raw = relative.to_str()?;
   let key = raw.replace('\\', "/");
   let key = key.trim_start_matches("./").to_string();
   (!key.is_empty()).then_some(key)
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn extension_is_last_dot_lowercased() {
      assert_eq!(file_extension("Main.RS"), Some(".rs".to_string()));
      assert_eq!(file_extension("app.min.js"), Some(".js".to_string()));
      assert_eq!(file_extension("Makefile"), None);
      assert_eq!(file_extension(".gitignore"), Some(".gitignore".to_string()));
   }

   #[test]
   fn code_extensions_accepted() {
      assert!(should_include("main.rs", 10));
      assert!(should_include("index.TS", 10));
      assert!(should_include("notes.md", 10));
   }

   #[test]
   fn binary_and_unknown_extensions_rejected() {
      assert!(!should_include("logo.png", 10));
      assert!(!should_include("Cargo.lock", 10));
      assert!(!should_include("bundle.map", 10));
      assert!(!should_include("Makefile", 10));
      assert!(!should_include("data.bin", 10));
   }

   #[test]
   fn oversized_files_rejected() {
      assert!(should_include("big.rs", 1_048_576));
      assert!(!should_include("big.rs", 1_048_577));
   }

   #[test]
   fn blocked_dirs_match_base_name_only() {
      assert!(is_blocked_dir("node_modules"));
      assert!(is_blocked_dir("__pycache__"));
      assert!(!is_blocked_dir("sources"));
   }

   #[test]
   fn relative_keys_are_forward_slash() {
      let root = Path::new("/ws/app");
      assert_eq!(
         relative_key(root, Path::new("/ws/app/src/main.rs")),
         Some("src/main.rs".to_string())
      );
      assert_eq!(relative_key(root, Path::new("/elsewhere/x.rs")), None);
   }
}

//! Project identity derivation.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Derives the stable identity for a (user, absolute path, leaf name)
/// triple.
///
/// The path is lowercased and backslashes map to forward slashes so the
/// same folder yields the same identity regardless of platform spelling.
/// Renaming or moving the folder mints a fresh identity; the server keys
/// project rows on this value.
pub fn project_identity(user_id: &str, folder_path: &str, folder_name: &str) -> String {
   let normalized = normalize_path(folder_path);
   let payload = format!("{user_id}:{normalized}:{folder_name}");
   hex::encode(Sha256::digest(payload.as_bytes()))
}

/// Lowercases and forward-slashes an absolute path string.
pub fn normalize_path(path: &str) -> String {
   path.to_lowercase().replace('\\', "/")
}

/// Splits a workspace root into the (folderPath, folderName) pair sent to
/// the check/create endpoints.
pub fn folder_parts(root: &Path) -> Result<(String, String)> {
   let folder_path = root
      .to_str()
      .ok_or_else(|| Error::InvalidPath(root.to_path_buf()))?
      .to_string();
   let folder_name = root
      .file_name()
      .and_then(|n| n.to_str())
      .unwrap_or("unknown")
      .to_string();
   Ok((folder_path, folder_name))
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn identity_ignores_path_case() {
      let a = project_identity("u1", "/Users/Dev/Project", "Project");
      let b = project_identity("u1", "/users/dev/project", "Project");
      assert_eq!(a, b);
   }

   #[test]
   fn identity_ignores_separator_style() {
      let a = project_identity("u1", r"C:\dev\project", "project");
      let b = project_identity("u1", "c:/dev/project", "project");
      assert_eq!(a, b);
   }

   #[test]
   fn identity_changes_on_rename_or_move() {
      let base = project_identity("u1", "/home/dev/app", "app");
      assert_ne!(base, project_identity("u1", "/home/dev/app2", "app2"));
      assert_ne!(base, project_identity("u1", "/home/dev/other/app", "app"));
      assert_ne!(base, project_identity("u2", "/home/dev/app", "app"));
   }

   #[test]
   fn identity_is_hex_sha256() {
      let id = project_identity("u1", "/a", "a");
      assert_eq!(id.len(), 64);
      assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
   }

   #[test]
   fn folder_parts_uses_leaf_name() {
      let (path, name) = folder_parts(Path::new("/home/dev/app")).unwrap();
      assert_eq!(path, "/home/dev/app");
      assert_eq!(name, "app");
   }
}

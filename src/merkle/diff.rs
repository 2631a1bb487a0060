//! Structural comparison of two hashed trees.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::MerkleNode;
use crate::hash::ContentHash;

/// One per-file change record. Paths are always file paths; directory
/// changes expand recursively into their files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "changeType", rename_all = "camelCase")]
pub enum Change {
   #[serde(rename_all = "camelCase")]
   Added { path: String, new_hash: ContentHash },
   #[serde(rename_all = "camelCase")]
   Modified {
      path:     String,
      old_hash: ContentHash,
      new_hash: ContentHash,
   },
   #[serde(rename_all = "camelCase")]
   Deleted { path: String, old_hash: ContentHash },
}

impl Change {
   pub fn path(&self) -> &str {
      match self {
         Self::Added { path, .. } | Self::Modified { path, .. } | Self::Deleted { path, .. } => {
            path
         },
      }
   }
}

/// Per-category counts for one comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
   #[serde(default)]
   pub added:    usize,
   #[serde(default)]
   pub modified: usize,
   #[serde(default)]
   pub deleted:  usize,
   #[serde(default)]
   pub total:    usize,
}

/// Full comparison result. The order of `changes` is unspecified.
#[derive(Debug, Clone, Default)]
pub struct TreeDiff {
   pub changes:          Vec<Change>,
   pub summary:          DiffSummary,
   pub files_to_process: Vec<String>,
   pub deleted_files:    Vec<String>,
}

impl TreeDiff {
   pub fn is_empty(&self) -> bool {
      self.changes.is_empty()
   }

   fn from_changes(changes: Vec<Change>) -> Self {
      let mut summary = DiffSummary::default();
      let mut files_to_process = Vec::new();
      let mut deleted_files = Vec::new();

      for change in &changes {
         match change {
            Change::Added { path, .. } => {
               summary.added += 1;
               files_to_process.push(path.clone());
            },
            Change::Modified { path, .. } => {
               summary.modified += 1;
               files_to_process.push(path.clone());
            },
            Change::Deleted { path, .. } => {
               summary.deleted += 1;
               deleted_files.push(path.clone());
            },
         }
      }
      summary.total = changes.len();

      Self { changes, summary, files_to_process, deleted_files }
   }
}

/// Compares an old tree (absent on first sight) against a freshly built
/// one. Equal root hashes short-circuit to the empty diff; comparison keys
/// on child `path`, which the builder keeps unique within a directory.
pub fn compare(old: Option<&MerkleNode>, new: &MerkleNode) -> TreeDiff {
   let mut changes = Vec::new();
   match old {
      None => collect_added(new, &mut changes),
      Some(old) if old.hash == new.hash => {},
      Some(old) => diff_nodes(old, new, &mut changes),
   }
   TreeDiff::from_changes(changes)
}

fn diff_nodes(old: &MerkleNode, new: &MerkleNode, out: &mut Vec<Change>) {
   if old.hash == new.hash {
      return;
   }

   match (old.is_leaf, new.is_leaf) {
      (true, true) => out.push(Change::Modified {
         path:     new.path.clone(),
         old_hash: old.hash,
         new_hash: new.hash,
      }),
      (false, false) => {
         let old_children: HashMap<&str, &MerkleNode> =
            old.children().iter().map(|c| (c.path.as_str(), c)).collect();
         let new_children: HashMap<&str, &MerkleNode> =
            new.children().iter().map(|c| (c.path.as_str(), c)).collect();

         for (path, old_child) in &old_children {
            if !new_children.contains_key(path) {
               collect_deleted(old_child, out);
            }
         }
         for (path, new_child) in &new_children {
            match old_children.get(path) {
               None => collect_added(new_child, out),
               Some(old_child) if old_child.hash != new_child.hash => {
                  diff_nodes(old_child, new_child, out);
               },
               Some(_) => {},
            }
         }
      },
      // File became directory or vice versa: the old subtree disappears
      // wholesale and the new one appears wholesale.
      _ => {
         collect_deleted(old, out);
         collect_added(new, out);
      },
   }
}

fn collect_added(node: &MerkleNode, out: &mut Vec<Change>) {
   if node.is_leaf {
      out.push(Change::Added { path: node.path.clone(), new_hash: node.hash });
   } else {
      for child in node.children() {
         collect_added(child, out);
      }
   }
}

fn collect_deleted(node: &MerkleNode, out: &mut Vec<Change>) {
   if node.is_leaf {
      out.push(Change::Deleted { path: node.path.clone(), old_hash: node.hash });
   } else {
      for child in node.children() {
         collect_deleted(child, out);
      }
   }
}

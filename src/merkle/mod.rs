//! Content-addressed directory trees mirrored by the ingestion server.
//!
//! The server rebuilds the same tree from the same inputs, so every rule
//! here (path joining, child ordering, hash layout) is wire-visible: any
//! deviation forks the hashes and breaks sync equivalence.

pub mod diff;

use std::{cmp::Ordering, collections::HashMap};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::hash::{self, ContentHash};

/// Path literal carried by the synthetic root node. Top-level children use
/// bare leaf names; deeper paths join with `/`.
pub const ROOT_PATH: &str = "root";

/// Node kind in the content-addressed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
   File,
   Directory,
}

/// One hashed node. File hashes cover the UTF-8 content; directory hashes
/// cover `hex(child hash) ++ child path` over children sorted by path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleNode {
   pub hash:        ContentHash,
   pub node_type:   NodeType,
   pub path:        String,
   pub size:        u64,
   pub modified_at: i64,
   pub created_at:  i64,
   pub is_leaf:     bool,
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub children:    Option<Vec<MerkleNode>>,
}

impl MerkleNode {
   pub fn is_directory(&self) -> bool {
      matches!(self.node_type, NodeType::Directory)
   }

   /// Children slice; empty for files.
   pub fn children(&self) -> &[MerkleNode] {
      self.children.as_deref().unwrap_or(&[])
   }

   /// Total number of file nodes in the subtree.
   pub fn file_count(&self) -> usize {
      if self.is_leaf {
         1
      } else {
         self.children().iter().map(MerkleNode::file_count).sum()
      }
   }
}

/// One file handed to the tree builder. `size` falls back to the UTF-8 byte
/// length of `content`; `last_modified` (milliseconds) falls back to the
/// injected clock.
#[derive(Debug, Clone)]
pub struct FileInput {
   pub path:          String,
   pub content:       String,
   pub size:          Option<u64>,
   pub last_modified: Option<i64>,
}

impl FileInput {
   pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
      Self { path: path.into(), content: content.into(), size: None, last_modified: None }
   }
}

/// Injected time source so the builder stays a pure function under test.
pub trait Clock: Send + Sync {
   /// Milliseconds since the Unix epoch.
   fn now_ms(&self) -> i64;
}

/// Wall-clock implementation used outside tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
   fn now_ms(&self) -> i64 {
      Utc::now().timestamp_millis()
   }
}

/// Orders paths by UTF-16 code units.
///
/// The server compares paths with JavaScript string ordering, which is
/// UTF-16 code-unit order; byte order diverges for supplementary-plane
/// characters, which would silently fork directory hashes.
pub fn cmp_utf16(a: &str, b: &str) -> Ordering {
   a.encode_utf16().cmp(b.encode_utf16())
}

/// Builds hashed trees from flat file lists.
pub struct TreeBuilder<C: Clock = SystemClock> {
   clock: C,
}

impl TreeBuilder {
   pub fn new() -> Self {
      Self { clock: SystemClock }
   }
}

impl Default for TreeBuilder {
   fn default() -> Self {
      Self::new()
   }
}

impl<C: Clock> TreeBuilder<C> {
   pub const fn with_clock(clock: C) -> Self {
      Self { clock }
   }

   pub fn clock(&self) -> &C {
      &self.clock
   }

   /// Builds the hashed tree for a flat file list.
   ///
   /// Later entries silently overwrite earlier entries at the same path;
   /// the input is expected pre-deduplicated but duplicates must not
   /// crash. The empty input yields the bare `root` directory node.
   pub fn build(&self, files: &[FileInput]) -> MerkleNode {
      let mut root = DirEntry::default();
      for file in files {
         let segments: Vec<&str> = file.path.split('/').filter(|s| !s.is_empty()).collect();
         root.insert(&segments, file);
      }
      build_directory(ROOT_PATH.to_string(), root, self.clock.now_ms())
   }
}

#[derive(Default)]
struct DirEntry<'a> {
   entries: HashMap<String, Entry<'a>>,
}

enum Entry<'a> {
   File(&'a FileInput),
   Dir(DirEntry<'a>),
}

impl<'a> DirEntry<'a> {
   fn insert(&mut self, segments: &[&str], file: &'a FileInput) {
      match segments {
         [] => {},
         [leaf] => {
            self.entries.insert((*leaf).to_string(), Entry::File(file));
         },
         [dir, rest @ ..] => {
            let entry = self
               .entries
               .entry((*dir).to_string())
               .or_insert_with(|| Entry::Dir(DirEntry::default()));
            // A file occupying an intermediate position is displaced by
            // the directory; last write wins either way.
            if !matches!(entry, Entry::Dir(_)) {
               *entry = Entry::Dir(DirEntry::default());
            }
            if let Entry::Dir(child) = entry {
               child.insert(rest, file);
            }
         },
      }
   }
}

fn child_path(parent: &str, name: &str) -> String {
   if parent == ROOT_PATH {
      name.to_string()
   } else {
      format!("{parent}/{name}")
   }
}

fn build_directory(path: String, dir: DirEntry<'_>, now_ms: i64) -> MerkleNode {
   let mut children: Vec<MerkleNode> = dir
      .entries
      .into_iter()
      .map(|(name, entry)| {
         let path = child_path(&path, &name);
         match entry {
            Entry::File(file) => build_file(path, file, now_ms),
            Entry::Dir(sub) => build_directory(path, sub, now_ms),
         }
      })
      .collect();
   children.sort_by(|a, b| cmp_utf16(&a.path, &b.path));

   let hash = hash::hash_directory(children.iter().map(|c| (&c.hash, c.path.as_str())));
   let timestamp = now_ms / 1000;

   MerkleNode {
      hash,
      node_type: NodeType::Directory,
      path,
      size: 0,
      modified_at: timestamp,
      created_at: timestamp,
      is_leaf: false,
      children: Some(children),
   }
}

fn build_file(path: String, file: &FileInput, now_ms: i64) -> MerkleNode {
   let timestamp = file.last_modified.unwrap_or(now_ms) / 1000;

   MerkleNode {
      hash: hash::hash_bytes(&file.content),
      node_type: NodeType::File,
      path,
      size: file.size.unwrap_or(file.content.len() as u64),
      modified_at: timestamp,
      created_at: timestamp,
      is_leaf: true,
      children: None,
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   struct FixedClock(i64);

   impl Clock for FixedClock {
      fn now_ms(&self) -> i64 {
         self.0
      }
   }

   fn builder() -> TreeBuilder<FixedClock> {
      TreeBuilder::with_clock(FixedClock(1_700_000_000_500))
   }

   #[test]
   fn empty_input_yields_bare_root() {
      let tree = builder().build(&[]);
      assert_eq!(tree.path, ROOT_PATH);
      assert_eq!(tree.node_type, NodeType::Directory);
      assert!(!tree.is_leaf);
      assert_eq!(tree.children(), &[]);
      assert_eq!(
         tree.hash.to_hex(),
         "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
      );
   }

   #[test]
   fn top_level_children_carry_bare_names() {
      let tree = builder().build(&[
         FileInput::new("src/x.ts", "A"),
         FileInput::new("README.md", "hi"),
      ]);
      let paths: Vec<&str> = tree.children().iter().map(|c| c.path.as_str()).collect();
      assert_eq!(paths, vec!["README.md", "src"]);

      let src = &tree.children()[1];
      assert_eq!(src.children()[0].path, "src/x.ts");
   }

   #[test]
   fn timestamps_floor_to_seconds() {
      let tree = builder().build(&[FileInput {
         path: "a.txt".to_string(),
         content: "x".to_string(),
         size: None,
         last_modified: Some(1_699_999_123_999),
      }]);
      let leaf = &tree.children()[0];
      assert_eq!(leaf.modified_at, 1_699_999_123);
      assert_eq!(leaf.created_at, 1_699_999_123);
   }

   #[test]
   fn clock_backs_missing_mtime() {
      let tree = builder().build(&[FileInput::new("a.txt", "x")]);
      assert_eq!(tree.children()[0].modified_at, 1_700_000_000);
   }

   #[test]
   fn size_falls_back_to_utf8_length() {
      let tree = builder().build(&[FileInput::new("a.txt", "héllo")]);
      assert_eq!(tree.children()[0].size, 6);
   }

   #[test]
   fn duplicate_paths_last_write_wins() {
      let tree = builder().build(&[
         FileInput::new("a.txt", "first"),
         FileInput::new("a.txt", "second"),
      ]);
      assert_eq!(tree.children().len(), 1);
      assert_eq!(tree.children()[0].hash, hash::hash_bytes("second"));
   }

   #[test]
   fn file_under_file_path_displaces_without_panicking() {
      let tree = builder().build(&[
         FileInput::new("a", "file"),
         FileInput::new("a/b", "nested"),
      ]);
      let a = &tree.children()[0];
      assert!(a.is_directory());
      assert_eq!(a.children()[0].path, "a/b");
   }

   #[test]
   fn utf16_ordering_matches_server() {
      // U+FF61 (halfwidth ideographic full stop) is one UTF-16 unit 0xFF61;
      // U+10000 encodes as the surrogate pair 0xD800 0xDC00 and must sort
      // first, even though its code point is higher.
      let supplementary = "\u{10000}.ts";
      let halfwidth = "\u{FF61}.ts";
      assert_eq!(cmp_utf16(supplementary, halfwidth), Ordering::Less);
      assert_eq!(supplementary.cmp(halfwidth), Ordering::Greater);

      let tree = builder().build(&[
         FileInput::new(halfwidth, "a"),
         FileInput::new(supplementary, "b"),
      ]);
      let paths: Vec<&str> = tree.children().iter().map(|c| c.path.as_str()).collect();
      assert_eq!(paths, vec![supplementary, halfwidth]);
   }

   #[test]
   fn serde_shape_is_camel_case() {
      let tree = builder().build(&[FileInput::new("a.txt", "hello")]);
      let value = serde_json::to_value(&tree).unwrap();
      assert_eq!(value["nodeType"], "directory");
      assert_eq!(value["isLeaf"], false);
      assert_eq!(value["children"][0]["nodeType"], "file");
      assert_eq!(
         value["children"][0]["hash"],
         "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
      );
      let back: MerkleNode = serde_json::from_value(value).unwrap();
      assert_eq!(back, tree);
   }
}

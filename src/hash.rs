//! Content hashing primitives shared by the tree builder and identity layer.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use sha2::{Digest, Sha256};

/// SHA-256 digest rendered as lowercase hex on the wire.
///
/// The server recomputes every digest independently, so the hex rendering
/// (not the raw bytes) is the canonical form: directory hashes concatenate
/// the *hex strings* of their children.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
   pub const fn new(hash: [u8; 32]) -> Self {
      Self(hash)
   }

   /// Parses a 64-character lowercase or uppercase hex string.
   pub fn from_hex(raw: &str) -> Option<Self> {
      let mut bytes = [0u8; 32];
      hex::decode_to_slice(raw, &mut bytes).ok()?;
      Some(Self(bytes))
   }

   /// Computes the SHA-256 hash of raw data.
   pub fn sum(data: impl AsRef<[u8]>) -> Self {
      Self(Sha256::digest(data.as_ref()).into())
   }

   pub fn to_hex(&self) -> String {
      hex::encode(self.0)
   }
}

impl AsRef<[u8]> for ContentHash {
   fn as_ref(&self) -> &[u8] {
      &self.0
   }
}

impl fmt::Display for ContentHash {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "{}", hex::encode(self.0))
   }
}

impl fmt::Debug for ContentHash {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "Hash({})", hex::encode(self.0))
   }
}

impl Serialize for ContentHash {
   fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
      serializer.serialize_str(&self.to_hex())
   }
}

impl<'de> Deserialize<'de> for ContentHash {
   fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
      let raw = String::deserialize(deserializer)?;
      Self::from_hex(&raw).ok_or_else(|| de::Error::custom(format!("invalid sha-256 hex: {raw}")))
   }
}

/// Hashes file content as UTF-8 bytes.
pub fn hash_bytes(content: &str) -> ContentHash {
   ContentHash::sum(content.as_bytes())
}

/// Combines already-sorted children into a directory hash.
///
/// Concatenates `hex(child hash) ++ child path` in the order given, with no
/// separators, length prefixes, or other framing. Callers sort before
/// calling; the empty iterator yields the hash of the empty string.
pub fn hash_directory<'a, I>(children: I) -> ContentHash
where
   I: IntoIterator<Item = (&'a ContentHash, &'a str)>,
{
   let mut hasher = Sha256::new();
   for (hash, path) in children {
      hasher.update(hash.to_hex().as_bytes());
      hasher.update(path.as_bytes());
   }
   ContentHash::new(hasher.finalize().into())
}

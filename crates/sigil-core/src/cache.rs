//! Memoized signature resolution.
//!
//! Two buckets, keyed by the exact signature text: plain scans and static
//! resolutions. Only offset-0 lookups are cached; a non-zero offset always
//! rescans. This asymmetry is contract, inherited from the declarative
//! binding surface, and deliberately not unified.
//!
//! Entries are write-once. A failed lookup is stored as address 0 and every
//! later lookup of the same key short-circuits to the same failure without
//! rescanning.

use std::collections::HashMap;

use crate::signature::Signature;

/// Address recorded for a signature that did not resolve.
pub const NOT_FOUND: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBucket {
    Scan,
    Static,
}

#[derive(Debug, Default)]
pub struct AddressCache {
    scans: HashMap<String, u64>,
    statics: HashMap<String, u64>,
}

impl AddressCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket(&self, bucket: CacheBucket) -> &HashMap<String, u64> {
        match bucket {
            CacheBucket::Scan => &self.scans,
            CacheBucket::Static => &self.statics,
        }
    }

    /// Cached address for an offset-0 lookup. `Some(NOT_FOUND)` means the
    /// signature is known to be absent.
    pub fn lookup(&self, bucket: CacheBucket, signature: &Signature, offset: i64) -> Option<u64> {
        if offset != 0 {
            return None;
        }
        self.bucket(bucket).get(signature.text()).copied()
    }

    /// Record an offset-0 result. First write wins; non-zero offsets are
    /// never stored.
    pub fn store(&mut self, bucket: CacheBucket, signature: &Signature, offset: i64, address: u64) {
        if offset != 0 {
            return;
        }
        let bucket = match bucket {
            CacheBucket::Scan => &mut self.scans,
            CacheBucket::Static => &mut self.statics,
        };
        bucket.entry(signature.text().to_string()).or_insert(address);
    }

    pub fn len(&self) -> usize {
        self.scans.len() + self.statics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty() && self.statics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(text: &str) -> Signature {
        Signature::parse(text).unwrap()
    }

    #[test]
    fn test_offset_zero_cached() {
        let mut cache = AddressCache::new();
        let signature = sig("48 8B 05");
        cache.store(CacheBucket::Scan, &signature, 0, 0x1400_1000);
        assert_eq!(
            cache.lookup(CacheBucket::Scan, &signature, 0),
            Some(0x1400_1000)
        );
        // Static bucket is independent.
        assert_eq!(cache.lookup(CacheBucket::Static, &signature, 0), None);
    }

    #[test]
    fn test_nonzero_offset_never_cached() {
        let mut cache = AddressCache::new();
        let signature = sig("48 8B 05");
        cache.store(CacheBucket::Scan, &signature, 8, 0x1400_1000);
        assert!(cache.is_empty());
        cache.store(CacheBucket::Scan, &signature, 0, 0x1400_1000);
        assert_eq!(cache.lookup(CacheBucket::Scan, &signature, 8), None);
    }

    #[test]
    fn test_entries_are_write_once() {
        let mut cache = AddressCache::new();
        let signature = sig("E8 ?? ?? ?? ??");
        cache.store(CacheBucket::Static, &signature, 0, NOT_FOUND);
        cache.store(CacheBucket::Static, &signature, 0, 0xDEAD);
        assert_eq!(
            cache.lookup(CacheBucket::Static, &signature, 0),
            Some(NOT_FOUND)
        );
    }

    #[test]
    fn test_key_is_textual_encoding() {
        let mut cache = AddressCache::new();
        cache.store(CacheBucket::Scan, &sig("48 8B"), 0, 0x1000);
        assert_eq!(cache.lookup(CacheBucket::Scan, &sig("488B"), 0), None);
    }
}

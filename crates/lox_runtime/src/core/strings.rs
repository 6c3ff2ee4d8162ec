//! String interning.
//!
//! The interner guarantees byte-equal strings share one heap object, which
//! makes string equality and table keying reference identity. The table is
//! keyed by FNV-1a over the string bytes and holds no strong claim on the
//! objects: entries whose string died in a collection are dropped after the
//! mark phase (a weak set).

use std::hash::{BuildHasherDefault, Hasher};
use std::rc::Rc;

use hashbrown::HashMap;

use crate::core::heap::{Heap, HeapObject, ObjStr, ObjectId};

/// 32-bit FNV-1a.
pub fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for b in bytes {
        hash ^= *b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

/// `Hasher` wrapper over [`fnv1a`], so the intern table probes on the same
/// hash the language definition specifies for strings.
pub struct Fnv1aHasher(u32);

impl Default for Fnv1aHasher {
    fn default() -> Self {
        Self(2166136261)
    }
}

impl Hasher for Fnv1aHasher {
    fn write(&mut self, bytes: &[u8]) {
        let mut hash = self.0;
        for b in bytes {
            hash ^= *b as u32;
            hash = hash.wrapping_mul(16777619);
        }
        self.0 = hash;
    }

    fn finish(&self) -> u64 {
        self.0 as u64
    }
}

pub struct Strings {
    map: HashMap<Rc<str>, ObjectId, BuildHasherDefault<Fnv1aHasher>>,
}

impl Strings {
    pub fn new() -> Self {
        Self {
            map: HashMap::default(),
        }
    }

    /// Return the id of the interned string with these bytes, allocating a
    /// new heap object only on first sight.
    pub fn intern(&mut self, heap: &mut Heap, text: &str) -> ObjectId {
        if let Some(&id) = self.map.get(text) {
            return id;
        }
        let rc: Rc<str> = Rc::from(text);
        let id = heap.alloc(HeapObject::Str(ObjStr { text: rc.clone() }));
        self.map.insert(rc, id);
        id
    }

    /// Concatenate two interned strings into a (possibly pre-existing)
    /// interned result.
    pub fn concat(&mut self, heap: &mut Heap, a: ObjectId, b: ObjectId) -> ObjectId {
        let mut text = String::with_capacity(
            heap.str_text(a).len() + heap.str_text(b).len(),
        );
        text.push_str(heap.str_text(a));
        text.push_str(heap.str_text(b));
        self.intern(heap, &text)
    }

    /// Drop entries whose heap object did not survive marking. Runs between
    /// trace and sweep.
    pub fn remove_dead(&mut self, heap: &Heap) {
        self.map.retain(|_, id| heap.is_marked(*id));
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for Strings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_reference_values() {
        // Published FNV-1a test vectors.
        assert_eq!(fnv1a(b""), 2166136261);
        assert_eq!(fnv1a(b"a"), 0xe40c292c);
        assert_eq!(fnv1a(b"foobar"), 0xbf9cf968);
    }

    #[test]
    fn interning_is_idempotent() {
        let mut heap = Heap::new();
        let mut strings = Strings::new();
        let a = strings.intern(&mut heap, "hello");
        let b = strings.intern(&mut heap, "hello");
        let c = strings.intern(&mut heap, "world");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(strings.len(), 2);
        assert_eq!(&**heap.str_text(a), "hello");
    }

    #[test]
    fn concat_interns_the_result() {
        let mut heap = Heap::new();
        let mut strings = Strings::new();
        let a = strings.intern(&mut heap, "foo");
        let b = strings.intern(&mut heap, "bar");
        let ab = strings.concat(&mut heap, a, b);
        let direct = strings.intern(&mut heap, "foobar");
        assert_eq!(ab, direct);
    }

    #[test]
    fn weak_entries_die_with_their_objects() {
        let mut heap = Heap::new();
        let mut strings = Strings::new();
        let kept = strings.intern(&mut heap, "kept");
        let _dead = strings.intern(&mut heap, "dead");
        heap.mark_object(kept);
        heap.trace();
        strings.remove_dead(&heap);
        heap.sweep();
        assert_eq!(strings.len(), 1);
        // Re-interning the dead bytes builds a fresh object.
        let reborn = strings.intern(&mut heap, "dead");
        assert_eq!(&**heap.str_text(reborn), "dead");
        assert_eq!(strings.len(), 2);
    }
}

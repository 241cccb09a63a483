//! Mark namespaces — isolation domains for independent mark owners.
//!
//! Every mark belongs to a namespace, so a plugin's mark ids can never collide
//! with another plugin's. Namespaces are registered once by name, receive a
//! monotonically assigned numeric id (starting at 1), and live for the rest of
//! the process — there is no deletion.
//!
//! The registry is a plain owned value: whoever owns the editor state owns one
//! registry and hands out ids. Queries scoped to a namespace only ever see
//! marks created under that id.

use rustc_hash::FxHashMap;

/// Registry of all mark namespaces.
///
/// Names are unique; ids are unique and never reused. An id is considered
/// initialized only if it was actually issued by [`NamespaceRegistry::create`]
/// — a bare counter comparison would claim ids that were never handed out.
#[derive(Debug)]
pub struct NamespaceRegistry {
    ids: FxHashMap<String, u64>,
    names: FxHashMap<u64, String>,
    next_id: u64,
}

impl NamespaceRegistry {
    /// Create an empty registry. The first namespace gets id 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: FxHashMap::default(),
            names: FxHashMap::default(),
            next_id: 1,
        }
    }

    /// Register a namespace, returning its new id.
    ///
    /// Returns `None` if `name` is already registered — the registry is left
    /// unchanged and the existing id is not disclosed (use [`Self::id`]).
    pub fn create(&mut self, name: &str) -> Option<u64> {
        if self.ids.contains_key(name) {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert(name.to_string(), id);
        self.names.insert(id, name.to_string());
        Some(id)
    }

    /// True iff `id` was issued by a prior [`Self::create`] call.
    #[must_use]
    pub fn is_initialized(&self, id: u64) -> bool {
        self.names.contains_key(&id)
    }

    /// Look up the id registered for `name`.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<u64> {
        self.ids.get(name).copied()
    }

    /// Look up the name registered under `id`.
    #[must_use]
    pub fn name(&self, id: u64) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Number of registered namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no namespace has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

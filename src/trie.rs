//! Character-keyed prefix tree for longest-match symbol lookup.
//!
//! Keys descend one character at a time, so finding the entity for an input
//! suffix is O(key length) regardless of how many symbols are bound, and
//! multi-character spellings (`<=`, `mod`, `arcsinh`) resolve without
//! ambiguity. Nodes are tagged: a leaf stores the unconsumed remainder of
//! its key, and inserting a key that overlaps a leaf splits it into a
//! branch.
//!
//! Tables are mutated only while a context or parameter set is being built;
//! lookups during evaluation see a frozen structure.

use rustc_hash::FxHashMap;

enum Node<V> {
    /// A single key whose remaining characters after the branch point are
    /// stored as one fragment
    Leaf { rest: Box<str>, value: V },
    /// An interior point; `value` is set when a key ends exactly here
    Branch {
        value: Option<V>,
        children: FxHashMap<char, Node<V>>,
    },
}

/// Prefix tree mapping spellings to values (entities, parameter slots).
pub(crate) struct Trie<V> {
    children: FxHashMap<char, Node<V>>,
    len: usize,
}

impl<V> Default for Trie<V> {
    fn default() -> Self {
        Trie {
            children: FxHashMap::default(),
            len: 0,
        }
    }
}

impl<V> Trie<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys inserted (overwrites not counted twice)
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert `key`, overwriting any value already stored under the exact
    /// same key. Last registration wins; this is intentional.
    pub fn insert(&mut self, key: &str, value: V) {
        let mut chars = key.chars();
        let Some(first) = chars.next() else { return };
        let replaced = insert_into(&mut self.children, first, chars.as_str(), value);
        if !replaced {
            self.len += 1;
        }
    }

    /// Find the value whose key is the longest recognizable prefix of
    /// `suffix`, returning it with the matched byte length.
    ///
    /// Descent is greedy: while a child exists for the next character the
    /// walk commits to it, and a leaf matches only when its stored fragment
    /// is a prefix of the remaining input.
    pub fn find<'t>(&'t self, suffix: &str) -> Option<(&'t V, usize)> {
        let mut chars = suffix.char_indices();
        let (_, first) = chars.next()?;
        let mut node = self.children.get(&first)?;
        let mut consumed = first.len_utf8();

        loop {
            match node {
                Node::Leaf { rest, value } => {
                    return suffix[consumed..]
                        .starts_with(rest.as_ref())
                        .then_some((value, consumed + rest.len()));
                }
                Node::Branch { value, children } => {
                    if let Some((_, next)) = chars.next() {
                        if let Some(child) = children.get(&next) {
                            node = child;
                            consumed += next.len_utf8();
                            continue;
                        }
                    }
                    // No deeper child claims the input; a key ending here wins
                    return value.as_ref().map(|v| (v, consumed));
                }
            }
        }
    }
}

/// Insert below one branch point. Returns true when an existing key was
/// overwritten.
fn insert_into<V>(
    children: &mut FxHashMap<char, Node<V>>,
    first: char,
    rest: &str,
    value: V,
) -> bool {
    use std::collections::hash_map::Entry;

    match children.entry(first) {
        Entry::Vacant(slot) => {
            slot.insert(Node::Leaf {
                rest: rest.into(),
                value,
            });
            false
        }
        Entry::Occupied(mut slot) => {
            let exact_leaf = matches!(
                slot.get(),
                Node::Leaf { rest: existing, .. } if existing.as_ref() == rest
            );
            if exact_leaf {
                slot.insert(Node::Leaf {
                    rest: rest.into(),
                    value,
                });
                return true;
            }
            if matches!(slot.get(), Node::Leaf { .. }) {
                // Keys diverge below this point: split the leaf into a
                // branch and reinsert both tails
                let old = slot.insert(Node::Branch {
                    value: None,
                    children: FxHashMap::default(),
                });
                let Node::Leaf {
                    rest: old_rest,
                    value: old_value,
                } = old
                else {
                    unreachable!("slot was just matched as a leaf");
                };
                let Node::Branch { value: end, children } = slot.get_mut() else {
                    unreachable!("slot was just replaced with a branch");
                };
                place(&mut *end, &mut *children, &old_rest, old_value);
                return place_replacing(end, children, rest, value);
            }
            let Node::Branch { value: end, children } = slot.get_mut() else {
                unreachable!("non-leaf nodes are branches");
            };
            place_replacing(end, children, rest, value)
        }
    }
}

/// Put a key tail under a branch, assuming no collision is possible
fn place<V>(
    end: &mut Option<V>,
    children: &mut FxHashMap<char, Node<V>>,
    rest: &str,
    value: V,
) {
    let mut chars = rest.chars();
    match chars.next() {
        None => *end = Some(value),
        Some(c) => {
            children.insert(
                c,
                Node::Leaf {
                    rest: chars.as_str().into(),
                    value,
                },
            );
        }
    }
}

/// Put a key tail under a branch, recursing into further collisions.
/// Returns true when an existing key was overwritten.
fn place_replacing<V>(
    end: &mut Option<V>,
    children: &mut FxHashMap<char, Node<V>>,
    rest: &str,
    value: V,
) -> bool {
    let mut chars = rest.chars();
    match chars.next() {
        None => end.replace(value).is_some(),
        Some(c) => insert_into(children, c, chars.as_str(), value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie(keys: &[&str]) -> Trie<usize> {
        let mut t = Trie::new();
        for (i, key) in keys.iter().enumerate() {
            t.insert(key, i);
        }
        t
    }

    #[test]
    fn single_key_matches_as_prefix_of_input() {
        let t = trie(&["sin"]);
        assert_eq!(t.find("sin(x)"), Some((&0, 3)));
        assert_eq!(t.find("sin"), Some((&0, 3)));
        assert_eq!(t.find("si"), None);
        assert_eq!(t.find("cos"), None);
    }

    #[test]
    fn longer_key_wins_when_input_supports_it() {
        let t = trie(&["sin", "sinh"]);
        assert_eq!(t.find("sinh(x)"), Some((&1, 4)));
        assert_eq!(t.find("sin(x)"), Some((&0, 3)));
    }

    #[test]
    fn insertion_order_does_not_matter_for_splits() {
        let t = trie(&["sinh", "sin"]);
        assert_eq!(t.find("sinh(x)"), Some((&0, 4)));
        assert_eq!(t.find("sin(x)"), Some((&1, 3)));
    }

    #[test]
    fn multi_character_operators_resolve() {
        let t = trie(&["<", "<=", "<>"]);
        assert_eq!(t.find("<= 2"), Some((&1, 2)));
        assert_eq!(t.find("<> 2"), Some((&2, 2)));
        assert_eq!(t.find("< 2"), Some((&0, 1)));
    }

    #[test]
    fn exact_key_overwrites() {
        let mut t = trie(&["mod"]);
        t.insert("mod", 7);
        assert_eq!(t.len(), 1);
        assert_eq!(t.find("mod 2"), Some((&7, 3)));
    }

    #[test]
    fn divergent_keys_share_a_prefix() {
        let t = trie(&["arcsin", "arccos", "arc"]);
        assert_eq!(t.find("arcsin(1)"), Some((&0, 6)));
        assert_eq!(t.find("arccos(1)"), Some((&1, 6)));
        assert_eq!(t.find("arc 2"), Some((&2, 3)));
    }

    #[test]
    fn non_ascii_keys_descend_per_char() {
        let t = trie(&["π", "πρ"]);
        assert_eq!(t.find("πρ2"), Some((&1, "πρ".len())));
        assert_eq!(t.find("π2"), Some((&0, "π".len())));
    }

    #[test]
    fn greedy_descent_commits_to_the_deeper_path() {
        // With keys "a" and "abc", input "abd" descends past "a" toward
        // "abc" and does not back up
        let t = trie(&["a", "abc"]);
        assert_eq!(t.find("abd"), None);
        assert_eq!(t.find("a+1"), Some((&0, 1)));
        assert_eq!(t.find("abcd"), Some((&1, 3)));
    }
}

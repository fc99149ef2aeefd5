//! Class identity and inheritance bookkeeping.
//!
//! Declarations in eki are keyed by [`ClassKey`], a cheap, clonable name for a
//! model or controller class.  A [`ClassHierarchy`] records which class extends
//! which, and [`PropertyLists`] keeps the append-only list of annotated
//! property names for each class.
//!
//! Property lists inherit additively: the first time a child class annotates a
//! property, its list starts as a copy of the nearest ancestor's list.  The
//! ancestor's list is never touched.
//!
//! ```rust
//! use eki::{ClassHierarchy, ClassKey, PropertyKind, PropertyLists};
//!
//! let base = ClassKey::new("Base");
//! let child = ClassKey::new("Child");
//! let mut hierarchy = ClassHierarchy::default();
//! hierarchy.declare(&base, None).unwrap();
//! hierarchy.declare(&child, Some(&base)).unwrap();
//!
//! let mut lists = PropertyLists::default();
//! lists.add(&hierarchy, &base, PropertyKind::Field, "id");
//! lists.add(&hierarchy, &child, PropertyKind::Field, "name");
//! assert_eq!(lists.get(&hierarchy, &base, PropertyKind::Field), ["id"]);
//! assert_eq!(lists.get(&hierarchy, &child, PropertyKind::Field), ["id", "name"]);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DeclarationError;

/// The name of a declared class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassKey(Arc<str>);

impl ClassKey {
    /// Creates a key for the named class.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The class name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ClassKey {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&ClassKey> for ClassKey {
    fn from(key: &ClassKey) -> Self {
        key.clone()
    }
}

impl AsRef<str> for ClassKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Anything that can name the class behind it.
pub trait HasClass {
    /// The class this value belongs to.
    fn class_key(&self) -> &ClassKey;
}

impl HasClass for ClassKey {
    fn class_key(&self) -> &ClassKey {
        self
    }
}

///////////////////////////////////////////// ClassHierarchy /////////////////////////////////////////////

/// Parent links between declared classes.
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    parents: HashMap<ClassKey, Option<ClassKey>>,
}

impl ClassHierarchy {
    /// Records `class` with an optional parent.
    ///
    /// Re-declaring a class with the same parent is a no-op.  Declaring it with
    /// a different parent, or with a parent that would close a cycle, is an
    /// error.
    pub fn declare(
        &mut self,
        class: &ClassKey,
        parent: Option<&ClassKey>,
    ) -> Result<(), DeclarationError> {
        if let Some(existing) = self.parents.get(class).cloned() {
            return match (existing.as_ref(), parent) {
                (Some(existing), Some(parent)) if existing != parent => {
                    Err(DeclarationError::ParentConflict {
                        class: class.clone(),
                        existing: existing.clone(),
                        requested: parent.clone(),
                    })
                }
                (None, Some(parent)) => {
                    self.check_cycle(class, parent)?;
                    self.parents.insert(class.clone(), Some(parent.clone()));
                    Ok(())
                }
                _ => Ok(()),
            };
        }
        if let Some(parent) = parent {
            self.check_cycle(class, parent)?;
            self.parents.entry(parent.clone()).or_insert(None);
        }
        self.parents.insert(class.clone(), parent.cloned());
        Ok(())
    }

    fn check_cycle(&self, class: &ClassKey, parent: &ClassKey) -> Result<(), DeclarationError> {
        if parent == class || self.ancestors(parent).any(|a| a == class) {
            return Err(DeclarationError::InheritanceCycle {
                class: class.clone(),
            });
        }
        Ok(())
    }

    /// True if `class` has been declared, either directly or as a parent.
    pub fn contains(&self, class: &ClassKey) -> bool {
        self.parents.contains_key(class)
    }

    /// The direct parent of `class`.
    pub fn parent(&self, class: &ClassKey) -> Option<&ClassKey> {
        self.parents.get(class).and_then(Option::as_ref)
    }

    /// Walks the parent chain of `class`, nearest ancestor first.
    pub fn ancestors<'a>(&'a self, class: &ClassKey) -> impl Iterator<Item = &'a ClassKey> + 'a {
        let mut next = self.parent(class);
        let mut steps = 0usize;
        let limit = self.parents.len();
        std::iter::from_fn(move || {
            let current = next?;
            steps += 1;
            if steps > limit {
                return None;
            }
            next = self.parent(current);
            Some(current)
        })
    }

    /// True if `class` is `ancestor` or inherits from it.
    pub fn is_a(&self, class: &ClassKey, ancestor: &ClassKey) -> bool {
        class == ancestor || self.ancestors(class).any(|a| a == ancestor)
    }
}

///////////////////////////////////////////// PropertyLists //////////////////////////////////////////////

/// Which annotated-property list is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// Model fields.
    Field,
    /// Controller actions.
    Action,
}

/// Append-only annotated-property lists, one per class and kind.
#[derive(Debug, Clone, Default)]
pub struct PropertyLists {
    lists: HashMap<(ClassKey, PropertyKind), Vec<String>>,
}

impl PropertyLists {
    /// Appends `property` to the list of `class`, copying the nearest
    /// ancestor's list first if the class has none of its own yet.
    pub fn add(
        &mut self,
        hierarchy: &ClassHierarchy,
        class: &ClassKey,
        kind: PropertyKind,
        property: &str,
    ) {
        let key = (class.clone(), kind);
        let inherited = if self.lists.contains_key(&key) {
            Vec::new()
        } else {
            self.inherited(hierarchy, class, kind).to_vec()
        };
        let list = self.lists.entry(key).or_insert(inherited);
        if !list.iter().any(|p| p == property) {
            list.push(property.to_string());
        }
    }

    /// The list visible from `class`: its own, or the nearest ancestor's.
    pub fn get(&self, hierarchy: &ClassHierarchy, class: &ClassKey, kind: PropertyKind) -> &[String] {
        match self.lists.get(&(class.clone(), kind)) {
            Some(list) => list,
            None => self.inherited(hierarchy, class, kind),
        }
    }

    /// True if `class` has started a list of its own.
    pub fn has_own(&self, class: &ClassKey, kind: PropertyKind) -> bool {
        self.lists.contains_key(&(class.clone(), kind))
    }

    fn inherited(&self, hierarchy: &ClassHierarchy, class: &ClassKey, kind: PropertyKind) -> &[String] {
        hierarchy
            .ancestors(class)
            .find_map(|ancestor| self.lists.get(&(ancestor.clone(), kind)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (ClassHierarchy, ClassKey, ClassKey, ClassKey) {
        let base = ClassKey::new("Base");
        let middle = ClassKey::new("Middle");
        let leaf = ClassKey::new("Leaf");
        let mut hierarchy = ClassHierarchy::default();
        hierarchy.declare(&base, None).unwrap();
        hierarchy.declare(&middle, Some(&base)).unwrap();
        hierarchy.declare(&leaf, Some(&middle)).unwrap();
        (hierarchy, base, middle, leaf)
    }

    #[test]
    fn ancestors_nearest_first() {
        let (hierarchy, base, middle, leaf) = chain();
        let ancestors: Vec<_> = hierarchy.ancestors(&leaf).cloned().collect();
        assert_eq!(ancestors, vec![middle.clone(), base.clone()]);
        assert!(hierarchy.is_a(&leaf, &base));
        assert!(!hierarchy.is_a(&base, &leaf));
    }

    #[test]
    fn redeclaring_with_other_parent_fails() {
        let (mut hierarchy, base, _, leaf) = chain();
        assert!(hierarchy.declare(&leaf, None).is_ok());
        let err = hierarchy.declare(&leaf, Some(&base)).unwrap_err();
        assert!(matches!(err, DeclarationError::ParentConflict { .. }));
    }

    #[test]
    fn cycles_are_rejected() {
        let (mut hierarchy, base, _, leaf) = chain();
        let err = hierarchy.declare(&base, Some(&leaf)).unwrap_err();
        assert!(matches!(err, DeclarationError::InheritanceCycle { .. }));
        let err = hierarchy.declare(&base, Some(&base)).unwrap_err();
        assert!(matches!(err, DeclarationError::InheritanceCycle { .. }));
    }

    #[test]
    fn child_list_never_mutates_parent() {
        let (hierarchy, base, middle, leaf) = chain();
        let mut lists = PropertyLists::default();
        lists.add(&hierarchy, &base, PropertyKind::Field, "id");
        lists.add(&hierarchy, &leaf, PropertyKind::Field, "name");
        lists.add(&hierarchy, &leaf, PropertyKind::Field, "name");
        assert_eq!(lists.get(&hierarchy, &base, PropertyKind::Field), ["id"]);
        assert_eq!(lists.get(&hierarchy, &middle, PropertyKind::Field), ["id"]);
        assert_eq!(lists.get(&hierarchy, &leaf, PropertyKind::Field), ["id", "name"]);
        assert!(!lists.has_own(&middle, PropertyKind::Field));
        assert!(lists.get(&hierarchy, &leaf, PropertyKind::Action).is_empty());
    }
}

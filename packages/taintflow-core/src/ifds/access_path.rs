/* Access Paths
 *
 * An access path abstracts a chain of storage locations: a base value
 * (local, argument, this) followed by field and array-element accessors,
 * e.g. `x.f[*].g`. Element accessors are index-insensitive: all cells of
 * an array collapse into one `[*]` accessor.
 *
 * Static fields have no base: their path starts directly with a static
 * field accessor.
 *
 * Paths are immutable; all operations return new paths.
 */

use std::fmt;

use serde::Serialize;

/// One step of an access path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Accessor {
    /// A named field. `is_static` marks a path root with no base value.
    Field { name: String, is_static: bool },
    /// Any element of an array.
    Element,
}

impl Accessor {
    pub fn field(name: impl Into<String>) -> Self {
        Accessor::Field {
            name: name.into(),
            is_static: false,
        }
    }

    pub fn static_field(name: impl Into<String>) -> Self {
        Accessor::Field {
            name: name.into(),
            is_static: true,
        }
    }
}

/// A base value plus a chain of accessors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AccessPath<V> {
    base: Option<V>,
    accessors: Vec<Accessor>,
}

impl<V: Clone + Eq> AccessPath<V> {
    /// Path rooted at a local value, with no accessors.
    pub fn from_base(base: V) -> Self {
        Self {
            base: Some(base),
            accessors: Vec::new(),
        }
    }

    /// Path rooted at a static field.
    pub fn from_static_field(name: impl Into<String>) -> Self {
        Self {
            base: None,
            accessors: vec![Accessor::static_field(name)],
        }
    }

    /// Raw constructor. A `None` base requires the first accessor to be a
    /// static field.
    pub fn new(base: Option<V>, accessors: Vec<Accessor>) -> Self {
        debug_assert!(
            base.is_some()
                || matches!(
                    accessors.first(),
                    Some(Accessor::Field { is_static: true, .. })
                ),
            "a baseless path must start with a static field accessor"
        );
        Self { base, accessors }
    }

    pub fn base(&self) -> Option<&V> {
        self.base.as_ref()
    }

    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    /// A path is static iff it has no base value.
    pub fn is_static(&self) -> bool {
        self.base.is_none()
    }

    /// A path with at least one accessor names a heap location.
    pub fn is_on_heap(&self) -> bool {
        !self.accessors.is_empty()
    }

    /// This path extended by one accessor.
    pub fn appended(&self, accessor: Accessor) -> Self {
        let mut accessors = self.accessors.clone();
        accessors.push(accessor);
        Self {
            base: self.base.clone(),
            accessors,
        }
    }

    /// This path extended by a tail of accessors.
    pub fn extended(&self, tail: &[Accessor]) -> Self {
        let mut accessors = self.accessors.clone();
        accessors.extend_from_slice(tail);
        Self {
            base: self.base.clone(),
            accessors,
        }
    }

    /// True iff `prefix` is a (non-strict) prefix of this path: same base,
    /// and every accessor of `prefix` matches in order.
    pub fn starts_with(&self, prefix: &AccessPath<V>) -> bool {
        self.base == prefix.base && self.accessors.starts_with(&prefix.accessors)
    }

    /// The accessor tail left after removing `prefix` from the front, or
    /// `None` if `prefix` is not a prefix of this path.
    pub fn minus(&self, prefix: &AccessPath<V>) -> Option<Vec<Accessor>> {
        if self.starts_with(prefix) {
            Some(self.accessors[prefix.accessors.len()..].to_vec())
        } else {
            None
        }
    }

    /// This path with all trailing `[*]` accessors stripped. Used to
    /// compare array contents with the array itself.
    pub fn remove_trailing_element_accessors(&self) -> Self {
        let mut accessors = self.accessors.clone();
        while matches!(accessors.last(), Some(Accessor::Element)) {
            accessors.pop();
        }
        Self {
            base: self.base.clone(),
            accessors,
        }
    }
}

impl<V: fmt::Display> fmt::Display for AccessPath<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.base {
            Some(base) => write!(f, "{base}")?,
            None => write!(f, "<static>")?,
        }
        for accessor in &self.accessors {
            match accessor {
                Accessor::Field { name, .. } => write!(f, ".{name}")?,
                Accessor::Element => write!(f, "[*]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn path(base: &str, fields: &[&str]) -> AccessPath<String> {
        let mut p = AccessPath::from_base(base.to_string());
        for f in fields {
            p = p.appended(Accessor::field(*f));
        }
        p
    }

    #[test]
    fn test_starts_with_requires_same_base() {
        let x_f = path("x", &["f"]);
        let y_f = path("y", &["f"]);
        assert!(!x_f.starts_with(&y_f));
        assert!(x_f.starts_with(&path("x", &[])));
        assert!(x_f.starts_with(&x_f));
    }

    #[test]
    fn test_minus_returns_accessor_tail() {
        let x_fg = path("x", &["f", "g"]);
        let x = path("x", &[]);
        assert_eq!(
            x_fg.minus(&x),
            Some(vec![Accessor::field("f"), Accessor::field("g")])
        );
        assert_eq!(x_fg.minus(&path("x", &["f"])), Some(vec![Accessor::field("g")]));
        assert_eq!(x_fg.minus(&path("y", &[])), None);
        assert_eq!(x.minus(&x_fg), None);
    }

    #[test]
    fn test_minus_then_extended_restores_path() {
        let x_fg = path("x", &["f", "g"]);
        let x_f = path("x", &["f"]);
        let tail = x_fg.minus(&x_f).unwrap();
        assert_eq!(x_f.extended(&tail), x_fg);
    }

    #[test]
    fn test_static_path_has_no_base_and_is_static() {
        let p: AccessPath<String> = AccessPath::from_static_field("CONFIG");
        assert!(p.is_static());
        assert!(p.is_on_heap());
        assert!(path("x", &[]).base().is_some());
        assert!(!path("x", &[]).is_on_heap());
    }

    #[test]
    fn test_remove_trailing_element_accessors() {
        let p = path("a", &[])
            .appended(Accessor::Element)
            .appended(Accessor::Element);
        assert_eq!(p.remove_trailing_element_accessors(), path("a", &[]));

        // Only trailing elements are stripped.
        let mixed = path("a", &[])
            .appended(Accessor::Element)
            .appended(Accessor::field("f"))
            .appended(Accessor::Element);
        assert_eq!(
            mixed.remove_trailing_element_accessors(),
            path("a", &[])
                .appended(Accessor::Element)
                .appended(Accessor::field("f"))
        );
    }

    #[test]
    fn test_display_renders_accessor_chain() {
        let p = path("x", &["f"]).appended(Accessor::Element);
        assert_eq!(p.to_string(), "x.f[*]");
        let s: AccessPath<String> = AccessPath::from_static_field("LOG");
        assert_eq!(s.to_string(), "<static>.LOG");
    }
}

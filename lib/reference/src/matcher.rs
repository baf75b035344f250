//! Type compatibility between variables and reference targets.

use crate::variable::Variable;
use flowform_schema::{OrderedMap, PropertyKind, PropertySchema, TypeEquality};

/// Decides whether a variable may be referenced by a field.
///
/// Kinds are compared by their effective kind, so a field in expression
/// mode is matched as the kind it was before the toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeMatcher {
    equality: TypeEquality,
}

impl TypeMatcher {
    /// Creates a matcher with the given equality mode.
    #[must_use]
    pub const fn new(equality: TypeEquality) -> Self {
        Self { equality }
    }

    /// Creates a matcher that compares top-level kinds only.
    #[must_use]
    pub const fn weak() -> Self {
        Self::new(TypeEquality::Weak)
    }

    /// Creates a matcher that compares full structure.
    #[must_use]
    pub const fn strong() -> Self {
        Self::new(TypeEquality::Strong)
    }

    /// Returns the equality mode.
    #[must_use]
    pub const fn equality(&self) -> TypeEquality {
        self.equality
    }

    /// Returns true if the variable matches any of the targets. An empty
    /// target list matches everything.
    #[must_use]
    pub fn is_compatible(&self, variable: &Variable, targets: &[PropertySchema]) -> bool {
        self.matches_any(&variable.schema, targets)
    }

    /// Returns true if the schema matches any of the targets. An empty
    /// target list matches everything.
    #[must_use]
    pub fn matches_any(&self, candidate: &PropertySchema, targets: &[PropertySchema]) -> bool {
        targets.is_empty() || targets.iter().any(|target| self.matches(candidate, target))
    }

    /// Compares one candidate against one target.
    #[must_use]
    pub fn matches(&self, candidate: &PropertySchema, target: &PropertySchema) -> bool {
        match self.equality {
            TypeEquality::Weak => candidate.effective_kind() == target.effective_kind(),
            TypeEquality::Strong => structurally_equal(candidate, target),
        }
    }
}

fn structurally_equal(left: &PropertySchema, right: &PropertySchema) -> bool {
    let kind = left.effective_kind();
    if kind != right.effective_kind() {
        return false;
    }
    match kind {
        PropertyKind::Object => {
            let empty = OrderedMap::new();
            let left = left.properties().unwrap_or(&empty);
            let right = right.properties().unwrap_or(&empty);
            left.len() == right.len()
                && left.iter().all(|(key, schema)| {
                    right
                        .get(key)
                        .is_some_and(|other| structurally_equal(schema, other))
                })
        }
        PropertyKind::Array => match (left.items(), right.items()) {
            (Some(left), Some(right)) => structurally_equal(left, right),
            (None, None) => true,
            _ => false,
        },
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(schema: PropertySchema) -> Variable {
        Variable {
            key: "v".to_string(),
            schema,
            path: "Node.v".to_string(),
            readonly: true,
        }
    }

    #[test]
    fn weak_mode_matches_any_target_kind() {
        let matcher = TypeMatcher::weak();
        let targets = [PropertySchema::string(), PropertySchema::number()];
        assert!(matcher.is_compatible(&variable(PropertySchema::string()), &targets));
        assert!(!matcher.is_compatible(&variable(PropertySchema::boolean()), &targets));
    }

    #[test]
    fn weak_mode_ignores_nested_structure() {
        let matcher = TypeMatcher::weak();
        let candidate = PropertySchema::object().with_property("a", PropertySchema::number());
        let target = PropertySchema::object().with_property("a", PropertySchema::string());
        assert!(matcher.is_compatible(&variable(candidate), &[target]));
    }

    #[test]
    fn strong_mode_compares_object_shapes() {
        let matcher = TypeMatcher::strong();
        let candidate = PropertySchema::object().with_property("a", PropertySchema::number());
        let mismatched = PropertySchema::object().with_property("a", PropertySchema::string());
        let matching = PropertySchema::object().with_property("a", PropertySchema::number());
        let extra = matching.clone().with_property("b", PropertySchema::number());

        assert!(!matcher.matches(&candidate, &mismatched));
        assert!(matcher.matches(&candidate, &matching));
        assert!(!matcher.matches(&candidate, &extra));
    }

    #[test]
    fn strong_mode_compares_array_items() {
        let matcher = TypeMatcher::strong();
        let numbers = PropertySchema::array(PropertySchema::number());
        let strings = PropertySchema::array(PropertySchema::string());
        assert!(matcher.matches(&numbers, &numbers.clone()));
        assert!(!matcher.matches(&numbers, &strings));
        assert!(TypeMatcher::weak().matches(&numbers, &strings));
    }

    #[test]
    fn empty_targets_accept_everything() {
        let matcher = TypeMatcher::strong();
        assert!(matcher.is_compatible(&variable(PropertySchema::file()), &[]));
    }

    #[test]
    fn numeric_kinds_are_distinct() {
        let matcher = TypeMatcher::weak();
        assert!(!matcher.matches(&PropertySchema::integer(), &PropertySchema::number()));
    }
}

//! Node templates.
//!
//! Every node type supplies the parameters a fresh node starts with and may
//! limit how many of its nodes a canvas holds.

use crate::error::TemplateError;
use crate::ordered::OrderedMap;
use crate::schema::PropertySchema;
use crate::tree::ParameterTree;
use crate::value::ValueBinding;
use rootcause::prelude::Report;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Factory for the parameters of one node type.
pub trait NodeTemplate: Send + Sync {
    /// Returns the node type this template creates.
    fn node_type(&self) -> &str;

    /// Returns the initial schema and values.
    fn initial_parameters(&self) -> (PropertySchema, OrderedMap<ValueBinding>);

    /// Returns whether another node may be added given how many nodes of
    /// this type the canvas already holds.
    fn can_add(&self, _existing: usize) -> bool {
        true
    }

    /// Builds the parameter tree for a new node.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTemplate` if the initial schema is not an object.
    fn instantiate(&self) -> Result<ParameterTree, TemplateError> {
        let (schema, values) = self.initial_parameters();
        ParameterTree::from_parts(schema, values).map_err(|e| TemplateError::InvalidTemplate {
            node_type: self.node_type().to_string(),
            reason: e.to_string(),
        })
    }
}

/// A template with fixed initial parameters.
#[derive(Debug, Clone)]
pub struct StaticTemplate {
    node_type: String,
    schema: PropertySchema,
    values: OrderedMap<ValueBinding>,
    max_instances: Option<usize>,
}

impl StaticTemplate {
    /// Creates a template whose nodes start with the given schema and zero
    /// values.
    #[must_use]
    pub fn new(node_type: impl Into<String>, schema: PropertySchema) -> Self {
        Self {
            node_type: node_type.into(),
            schema,
            values: OrderedMap::new(),
            max_instances: None,
        }
    }

    /// Sets initial values.
    #[must_use]
    pub fn with_values(mut self, values: OrderedMap<ValueBinding>) -> Self {
        self.values = values;
        self
    }

    /// Limits how many nodes of this type a canvas may hold.
    #[must_use]
    pub fn with_max_instances(mut self, max: usize) -> Self {
        self.max_instances = Some(max);
        self
    }
}

impl NodeTemplate for StaticTemplate {
    fn node_type(&self) -> &str {
        &self.node_type
    }

    fn initial_parameters(&self) -> (PropertySchema, OrderedMap<ValueBinding>) {
        (self.schema.clone(), self.values.clone())
    }

    fn can_add(&self, existing: usize) -> bool {
        self.max_instances.is_none_or(|max| existing < max)
    }
}

/// Templates keyed by node type.
#[derive(Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Box<dyn NodeTemplate>>,
}

impl TemplateRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a template, replacing any template for the same node type.
    pub fn register(&mut self, template: impl NodeTemplate + 'static) {
        self.templates
            .insert(template.node_type().to_string(), Box::new(template));
    }

    /// Gets the template for a node type.
    #[must_use]
    pub fn get(&self, node_type: &str) -> Option<&dyn NodeTemplate> {
        self.templates.get(node_type).map(|template| &**template)
    }

    /// Returns the registered node types.
    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Returns the number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Creates the parameters for a new node of the given type.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unknown, the template refuses another
    /// node, or its initial parameters are invalid.
    #[instrument(skip(self))]
    pub fn instantiate(
        &self,
        node_type: &str,
        existing: usize,
    ) -> Result<ParameterTree, Report<TemplateError>> {
        let template = self
            .get(node_type)
            .ok_or_else(|| TemplateError::UnknownNodeType {
                node_type: node_type.to_string(),
            })?;
        if !template.can_add(existing) {
            return Err(TemplateError::AddRefused {
                node_type: node_type.to_string(),
            }
            .into());
        }
        let tree = template.instantiate()?;
        debug!(properties = tree.values().len(), "node parameters created");
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::PropertyKind;
    use crate::path::PropertyPath;
    use crate::value::LiteralValue;

    fn http_template() -> StaticTemplate {
        let schema = PropertySchema::object()
            .with_property("url", PropertySchema::string())
            .with_property("retries", PropertySchema::integer());
        let values: OrderedMap<ValueBinding> = [
            ("url", ValueBinding::string("https://example.com")),
            ("stale", ValueBinding::string("dropped")),
        ]
        .into_iter()
        .collect();
        StaticTemplate::new("http", schema).with_values(values)
    }

    #[test]
    fn instantiate_reconciles_values_with_schema() {
        let mut registry = TemplateRegistry::new();
        registry.register(http_template());

        let tree = registry.instantiate("http", 0).expect("instantiate");
        assert_eq!(
            tree.value_at(&PropertyPath::parse("url")),
            Some(&ValueBinding::string("https://example.com"))
        );
        assert_eq!(
            tree.value_at(&PropertyPath::parse("retries")),
            Some(&ValueBinding::Literal(LiteralValue::Integer(0)))
        );
        assert!(!tree.values().contains_key("stale"));
        assert_eq!(tree.version(), 0);
    }

    #[test]
    fn unknown_node_type_is_rejected() {
        let registry = TemplateRegistry::new();
        let err = registry.instantiate("missing", 0).unwrap_err();
        assert!(err.to_string().contains("unknown node type"));
    }

    #[test]
    fn max_instances_limits_additions() {
        let mut registry = TemplateRegistry::new();
        registry.register(
            StaticTemplate::new("start", PropertySchema::object()).with_max_instances(1),
        );

        assert!(registry.instantiate("start", 0).is_ok());
        let err = registry.instantiate("start", 1).unwrap_err();
        assert!(err.to_string().contains("cannot be added"));
    }

    #[test]
    fn non_object_template_is_invalid() {
        let template = StaticTemplate::new("broken", PropertySchema::new(PropertyKind::Number));
        let err = template.instantiate().unwrap_err();
        assert!(matches!(err, TemplateError::InvalidTemplate { .. }));
    }

    #[test]
    fn registry_lists_node_types() {
        let mut registry = TemplateRegistry::new();
        assert!(registry.is_empty());
        registry.register(http_template());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.node_types().collect::<Vec<_>>(), vec!["http"]);
        assert!(registry.get("http").is_some());
    }
}

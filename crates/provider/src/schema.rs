//! Resource schema definitions
//!
//! Descriptive schemas published for each resource and data source: the
//! attribute names, types, and required/computed flags a plan layer needs.
//! Enforcement beyond attribute presence is left to the platform; handlers
//! rely on their typed configuration decode instead.

/// Type of a schema attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Int,
    Bool,
    List(Box<AttributeType>),
    Map(Box<AttributeType>),
    Object(Vec<Attribute>),
}

/// One attribute of a resource schema
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: &'static str,
    pub attr_type: AttributeType,
    pub required: bool,
    pub computed: bool,
    pub description: &'static str,
}

impl Attribute {
    /// New optional attribute of the given type.
    pub fn new(name: &'static str, attr_type: AttributeType) -> Self {
        Self {
            name,
            attr_type,
            required: false,
            computed: false,
            description: "",
        }
    }

    /// Practitioners must set this attribute.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// The platform fills this attribute in; practitioners never set it.
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }
}

/// Named attribute set for one resource or data-source type
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub type_name: &'static str,
    pub attributes: Vec<Attribute>,
}

impl ResourceSchema {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            attributes: Vec::new(),
        }
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Names of the attributes practitioners must set.
    pub fn required_attributes(&self) -> Vec<&'static str> {
        self.attributes
            .iter()
            .filter(|a| a.required)
            .map(|a| a.name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_start_optional() {
        let attr = Attribute::new("name", AttributeType::String);
        assert!(!attr.required);
        assert!(!attr.computed);
        assert_eq!(attr.description, "");
    }

    #[test]
    fn builder_sets_flags() {
        let attr = Attribute::new("id", AttributeType::String)
            .computed()
            .with_description("Platform-assigned identifier");
        assert!(attr.computed);
        assert_eq!(attr.description, "Platform-assigned identifier");
    }

    #[test]
    fn schema_lookup_and_required_listing() {
        let schema = ResourceSchema::new("altus_example")
            .attribute(Attribute::new("id", AttributeType::String).computed())
            .attribute(Attribute::new("name", AttributeType::String).required())
            .attribute(Attribute::new("size", AttributeType::Int).required());

        assert_eq!(schema.type_name, "altus_example");
        assert!(schema.get("id").unwrap().computed);
        assert!(schema.get("missing").is_none());
        assert_eq!(schema.required_attributes(), vec!["name", "size"]);
    }

    #[test]
    fn nested_attribute_types() {
        let routes = AttributeType::List(Box::new(AttributeType::Object(vec![
            Attribute::new("protocol", AttributeType::String).required(),
            Attribute::new("port", AttributeType::Int).required(),
        ])));

        match &routes {
            AttributeType::List(inner) => match inner.as_ref() {
                AttributeType::Object(attrs) => assert_eq!(attrs.len(), 2),
                other => panic!("expected Object, got {other:?}"),
            },
            other => panic!("expected List, got {other:?}"),
        }
    }
}

use crate::ArgumentValue;
use indexmap::IndexMap;

pub type SelectionArgument = (String, ArgumentValue);

/// One node of the client selection tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Field(FieldSelection),
    /// Reference to a named fragment, resolved lazily through the
    /// operation's fragment table.
    FragmentSpread { name: String },
    /// A type-conditioned inline fragment; walked only when the current
    /// entity matches the condition.
    InlineFragment {
        type_condition: Option<String>,
        selections: Vec<Selection>,
    },
}

/// A field selection: name, optional alias, arguments and children.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSelection {
    pub name: String,
    pub alias: Option<String>,
    pub arguments: Vec<SelectionArgument>,
    pub nested: Vec<Selection>,
}

impl FieldSelection {
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            arguments: Vec::new(),
            nested: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn argument(mut self, name: impl Into<String>, value: impl Into<ArgumentValue>) -> Self {
        self.arguments.push((name.into(), value.into()));
        self
    }

    pub fn nested(mut self, selection: impl Into<Selection>) -> Self {
        self.nested.push(selection.into());
        self
    }

    pub fn nested_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = FieldSelection>,
    {
        self.nested.extend(fields.into_iter().map(Selection::Field));
        self
    }

    pub fn lookup_argument(&self, name: &str) -> Option<&ArgumentValue> {
        self.arguments
            .iter()
            .find_map(|(arg, value)| (arg == name).then_some(value))
    }

    /// The response key of this field: its alias when present.
    pub fn response_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn has_nested_selections(&self) -> bool {
        !self.nested.is_empty()
    }

    /// Looks up a directly nested field by name.
    pub fn find_nested(&self, name: &str) -> Option<&FieldSelection> {
        self.nested.iter().find_map(|selection| match selection {
            Selection::Field(field) if field.name == name => Some(field),
            _ => None,
        })
    }
}

impl From<FieldSelection> for Selection {
    fn from(field: FieldSelection) -> Self {
        Selection::Field(field)
    }
}

/// A named fragment definition, referenced by `FragmentSpread` nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentDefinition {
    pub type_condition: Option<String>,
    pub selections: Vec<Selection>,
}

/// The operation's fragment table.
pub type Fragments = IndexMap<String, FragmentDefinition>;

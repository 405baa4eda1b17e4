//! Component definitions that blocks can be created from.

use kurbo::Size;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};

/// One choice of a select property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A column of a table property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub label: String,
    pub field: String,
}

/// How the property form edits a prop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropKind {
    Input,
    Color,
    Select { options: Vec<SelectOption> },
    Table { columns: Vec<TableColumn> },
}

/// An editable prop of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropSpec {
    pub name: String,
    pub label: String,
    pub kind: PropKind,
    /// Value given to new blocks.
    #[serde(default)]
    pub default: Value,
}

impl PropSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: PropKind, default: Value) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            default,
        }
    }
}

/// A component that can be dropped onto the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDef {
    /// Registry key, stored in `Block::component_key`.
    pub key: String,
    /// Menu label.
    pub label: String,
    /// Size used until the host measures the rendered block.
    pub default_size: Size,
    #[serde(default)]
    pub props: Vec<PropSpec>,
}

impl ComponentDef {
    pub fn new(key: impl Into<String>, label: impl Into<String>, default_size: Size) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            default_size,
            props: Vec::new(),
        }
    }

    pub fn with_prop(mut self, prop: PropSpec) -> Self {
        self.props.push(prop);
        self
    }

    /// Initial props for a new block.
    pub fn default_props(&self) -> BTreeMap<String, Value> {
        self.props
            .iter()
            .map(|p| (p.name.clone(), p.default.clone()))
            .collect()
    }
}

/// Registered components, kept in registration order for the palette.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    components: Vec<ComponentDef>,
    index: HashMap<String, usize>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in button, title, input and radio.
    pub fn with_basic_components() -> Self {
        let sizes = vec![
            SelectOption::new("Default", ""),
            SelectOption::new("Large", "large"),
            SelectOption::new("Small", "small"),
        ];
        let mut registry = Self::new();
        registry.register(
            ComponentDef::new("button", "Button", Size::new(80.0, 32.0))
                .with_prop(PropSpec::new("text", "Text", PropKind::Input, json!("Button")))
                .with_prop(PropSpec::new(
                    "type",
                    "Type",
                    PropKind::Select {
                        options: vec![
                            SelectOption::new("Default", "default"),
                            SelectOption::new("Primary", "primary"),
                            SelectOption::new("Success", "success"),
                            SelectOption::new("Warning", "warning"),
                            SelectOption::new("Danger", "danger"),
                        ],
                    },
                    json!("default"),
                ))
                .with_prop(PropSpec::new(
                    "size",
                    "Size",
                    PropKind::Select {
                        options: sizes.clone(),
                    },
                    json!(""),
                )),
        );
        registry.register(
            ComponentDef::new("title", "Title", Size::new(120.0, 40.0))
                .with_prop(PropSpec::new("text", "Text", PropKind::Input, json!("Title")))
                .with_prop(PropSpec::new("color", "Color", PropKind::Color, json!("#000000"))),
        );
        registry.register(
            ComponentDef::new("input", "Input", Size::new(200.0, 32.0))
                .with_prop(PropSpec::new(
                    "placeholder",
                    "Placeholder",
                    PropKind::Input,
                    json!("Please enter"),
                ))
                .with_prop(PropSpec::new(
                    "size",
                    "Size",
                    PropKind::Select { options: sizes },
                    json!(""),
                )),
        );
        registry.register(
            ComponentDef::new("radio", "Radio", Size::new(160.0, 32.0)).with_prop(PropSpec::new(
                "options",
                "Options",
                PropKind::Table {
                    columns: vec![
                        TableColumn {
                            label: "Label".into(),
                            field: "label".into(),
                        },
                        TableColumn {
                            label: "Value".into(),
                            field: "value".into(),
                        },
                    ],
                },
                json!([{ "label": "Option", "value": "option" }]),
            )),
        );
        registry
    }

    /// Add a component. A key that is already registered is ignored.
    /// Returns true if the component was added.
    pub fn register(&mut self, component: ComponentDef) -> bool {
        if self.index.contains_key(&component.key) {
            log::debug!("Component already registered: {}", component.key);
            return false;
        }
        self.index.insert(component.key.clone(), self.components.len());
        self.components.push(component);
        true
    }

    pub fn get(&self, key: &str) -> Option<&ComponentDef> {
        self.index.get(key).map(|&idx| &self.components[idx])
    }

    /// Components in registration order.
    pub fn list(&self) -> &[ComponentDef] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

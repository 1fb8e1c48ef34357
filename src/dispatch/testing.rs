//! In-memory resources for dispatcher tests. Every call echoes the method
//! name and the arguments it received.

use anyhow::{Result, bail};
use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::registry::{
    ParamSpec, ParamType, Registry, Resource, ResourceOutline, Signature,
};

#[derive(Debug, Clone, Default)]
pub struct MockResource {
    pub name: String,
    /// `None` signature = method exists but cannot be introspected.
    pub methods: BTreeMap<String, Option<Signature>>,
    pub accessors: BTreeMap<String, (Signature, MockResource)>,
    pub properties: BTreeMap<String, MockResource>,
}

impl MockResource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn method(mut self, name: &str, params: Vec<ParamSpec>) -> Self {
        self.methods
            .insert(name.to_string(), Some(Signature::new(params)));
        self
    }

    pub fn opaque_method(mut self, name: &str) -> Self {
        self.methods.insert(name.to_string(), None);
        self
    }

    pub fn accessor(mut self, name: &str, params: Vec<ParamSpec>, child: MockResource) -> Self {
        self.accessors
            .insert(name.to_string(), (Signature::new(params), child));
        self
    }

    pub fn property(mut self, name: &str, child: MockResource) -> Self {
        self.properties.insert(name.to_string(), child);
        self
    }
}

impl Resource for MockResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_method(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    fn signature(&self, method: &str) -> Option<Signature> {
        self.methods.get(method).cloned().flatten()
    }

    fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        if method == "fail" {
            bail!("HTTP 500: upstream exploded");
        }
        Ok(json!({ "resource": self.name, "method": method, "args": args }))
    }

    fn accessor(&self, name: &str) -> Option<Signature> {
        self.accessors.get(name).map(|(sig, _)| sig.clone())
    }

    fn open(&self, name: &str, args: Vec<Value>) -> Result<Box<dyn Resource>> {
        let Some((_, child)) = self.accessors.get(name) else {
            bail!("no accessor {name}");
        };
        let label = args
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let mut opened = child.clone();
        opened.name = format!("{}({label})", child.name);
        Ok(Box::new(opened))
    }

    fn property(&self, name: &str) -> Option<Box<dyn Resource>> {
        self.properties
            .get(name)
            .map(|child| Box::new(child.clone()) as Box<dyn Resource>)
    }

    fn describe(&self) -> ResourceOutline {
        ResourceOutline {
            name: self.name.clone(),
            methods: self
                .methods
                .iter()
                .map(|(n, s)| (n.clone(), s.clone().unwrap_or_default()))
                .collect(),
            accessors: self
                .accessors
                .iter()
                .map(|(n, (s, _))| (n.clone(), s.clone()))
                .collect(),
            properties: self.properties.keys().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockRegistry {
    pub roots: BTreeMap<String, MockResource>,
}

impl Registry for MockRegistry {
    fn resolve(&self, root: &str) -> Option<Box<dyn Resource>> {
        self.roots
            .get(root)
            .map(|r| Box::new(r.clone()) as Box<dyn Resource>)
    }

    fn roots(&self) -> Vec<String> {
        self.roots.keys().cloned().collect()
    }
}

fn filters() -> ParamSpec {
    ParamSpec::optional("filters", ParamType::Array, json!({}))
}

/// `leads` root with a parameterised `notes` accessor and an `aggregation` property.
pub fn leads_registry() -> MockRegistry {
    let notes = MockResource::new("notes")
        .method("list", vec![])
        .method(
            "create",
            vec![
                ParamSpec::required("content", ParamType::String),
                ParamSpec::optional("type", ParamType::String, json!("note")),
                ParamSpec::optional("options", ParamType::Array, json!({})),
            ],
        );
    let aggregation = MockResource::new("aggregation").method("search", vec![filters()]);

    let leads = MockResource::new("leads")
        .method("search", vec![filters()])
        .method("get", vec![ParamSpec::required("leadId", ParamType::Int)])
        .method("create", vec![ParamSpec::required("data", ParamType::Array)])
        .method(
            "update",
            vec![
                ParamSpec::required("leadId", ParamType::Int),
                ParamSpec::required("data", ParamType::Array),
            ],
        )
        .method(
            "list",
            vec![
                ParamSpec::optional("page", ParamType::Int, json!(1)),
                ParamSpec::optional("perPage", ParamType::Int, json!(20)),
                filters(),
            ],
        )
        .method(
            "triple",
            vec![
                ParamSpec::required("first", ParamType::Mixed),
                ParamSpec::required("second", ParamType::Mixed),
                ParamSpec::required("third", ParamType::Mixed),
                ParamSpec::optional("options", ParamType::Array, json!({})),
            ],
        )
        .method(
            "annotate",
            vec![
                ParamSpec::required("content", ParamType::String),
                ParamSpec::optional("meta", ParamType::Array, json!({"source": "cli"})),
            ],
        )
        .method("fail", vec![])
        .opaque_method("raw")
        .accessor(
            "notes",
            vec![ParamSpec::required("leadId", ParamType::Int)],
            notes,
        )
        .property("aggregation", aggregation);

    let mut roots = BTreeMap::new();
    roots.insert("leads".to_string(), leads);
    MockRegistry { roots }
}

/*!
catalog.rs - descriptor-table resources.

Every resource, method and sub-resource accessor of the IRIS API is declared
in a YAML catalog (`catalog.yaml` is embedded as the built-in surface; a
user catalog can replace it). `CatalogResource` implements `Resource` on top
of those descriptors:

  - methods       -> build an `ApiRequest` and hand it to the `Transport`
  - accessors     -> bind their arguments and return a child resource
  - properties    -> return a child resource with the same bindings

Argument placement on invoke:
  - `{name}` placeholders in the path are filled from accessor bindings,
    then from call arguments (snake_case spelling accepted)
  - array-typed arguments holding a map are flattened into parameters
  - everything else goes to the query (GET/DELETE) or body (POST/PUT/PATCH)
  - `opaque` methods expose no signature; their positional arguments fill
    placeholders in order and map arguments become parameters
*/

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::rc::Rc;

use super::transport::{ApiRequest, Transport};
use super::{ParamSpec, Registry, Resource, ResourceOutline, Signature};
use crate::utils::naming::to_snake_case;

const BUILTIN_CATALOG: &str = include_str!("catalog.yaml");

/* ---- Descriptor Types ---- */

#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    pub roots: Vec<String>,
    pub resources: BTreeMap<String, ResourceDef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResourceDef {
    pub description: Option<String>,
    pub methods: BTreeMap<String, MethodDef>,
    pub accessors: BTreeMap<String, AccessorDef>,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MethodDef {
    #[serde(default = "default_verb")]
    pub verb: String,
    pub path: String,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    /// No introspectable signature; callers bind positionally.
    #[serde(default)]
    pub opaque: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessorDef {
    pub resource: String,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
}

fn default_verb() -> String {
    "GET".to_string()
}

impl Catalog {
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_CATALOG).context("built-in catalog is invalid")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog: {}", path.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("failed to load catalog: {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let mut catalog: Catalog = serde_yaml::from_str(raw).context("failed to parse catalog YAML")?;
        for def in catalog.resources.values_mut() {
            for method in def.methods.values_mut() {
                method.verb = method.verb.to_ascii_uppercase();
            }
        }
        catalog.validate()?;
        Ok(catalog)
    }

    /// Reject dangling references, member name clashes and required
    /// parameters declared after optional ones.
    pub fn validate(&self) -> Result<()> {
        for root in &self.roots {
            if !self.resources.contains_key(root) {
                bail!("root '{root}' has no resource definition");
            }
        }
        for (name, def) in &self.resources {
            let mut seen = BTreeSet::new();
            let members = def
                .methods
                .keys()
                .chain(def.accessors.keys())
                .chain(def.properties.keys());
            for member in members {
                if !seen.insert(member.as_str()) {
                    bail!("resource '{name}' declares '{member}' more than once");
                }
            }
            for (acc, acc_def) in &def.accessors {
                if !self.resources.contains_key(&acc_def.resource) {
                    bail!(
                        "accessor '{name}.{acc}' points to unknown resource '{}'",
                        acc_def.resource
                    );
                }
                check_param_order(&format!("{name}.{acc}"), &acc_def.params)?;
            }
            for (prop, target) in &def.properties {
                if !self.resources.contains_key(target) {
                    bail!("property '{name}.{prop}' points to unknown resource '{target}'");
                }
            }
            for (method, m) in &def.methods {
                check_param_order(&format!("{name}.{method}"), &m.params)?;
            }
        }
        Ok(())
    }

    /// Every callable endpoint reachable from the roots, with its signature
    /// (`None` for opaque methods).
    pub fn endpoints(&self) -> Vec<(String, Option<Signature>)> {
        let mut out = Vec::new();
        for root in &self.roots {
            let mut visiting = vec![root.clone()];
            self.collect_endpoints(root, root, &mut visiting, &mut out);
        }
        out
    }

    fn collect_endpoints(
        &self,
        prefix: &str,
        resource: &str,
        visiting: &mut Vec<String>,
        out: &mut Vec<(String, Option<Signature>)>,
    ) {
        let Some(def) = self.resources.get(resource) else {
            return;
        };
        for (name, m) in &def.methods {
            let sig = (!m.opaque).then(|| Signature::new(m.params.clone()));
            out.push((format!("{prefix}.{name}"), sig));
        }
        let children = def
            .accessors
            .iter()
            .map(|(n, a)| (n, &a.resource))
            .chain(def.properties.iter());
        for (name, child) in children {
            if visiting.contains(child) {
                continue;
            }
            visiting.push(child.clone());
            self.collect_endpoints(&format!("{prefix}.{name}"), child, visiting, out);
            visiting.pop();
        }
    }
}

fn check_param_order(owner: &str, params: &[ParamSpec]) -> Result<()> {
    let mut optional_seen = false;
    for p in params {
        if p.optional {
            optional_seen = true;
        } else if optional_seen {
            bail!("'{owner}': required parameter '{}' follows an optional one", p.name);
        }
    }
    Ok(())
}

/* ---- Registry ---- */

/// Root resolver over a catalog.
pub struct CatalogRegistry {
    catalog: Rc<Catalog>,
    transport: Rc<dyn Transport>,
}

impl CatalogRegistry {
    pub fn new(catalog: Catalog, transport: Rc<dyn Transport>) -> Self {
        Self {
            catalog: Rc::new(catalog),
            transport,
        }
    }
}

impl Registry for CatalogRegistry {
    fn resolve(&self, root: &str) -> Option<Box<dyn Resource>> {
        if !self.catalog.roots.iter().any(|r| r == root) {
            return None;
        }
        Some(Box::new(CatalogResource {
            catalog: Rc::clone(&self.catalog),
            transport: Rc::clone(&self.transport),
            name: root.to_string(),
            bindings: Map::new(),
        }))
    }

    fn roots(&self) -> Vec<String> {
        self.catalog.roots.clone()
    }
}

/* ---- Resource ---- */

static EMPTY_DEF: ResourceDef = ResourceDef {
    description: None,
    methods: BTreeMap::new(),
    accessors: BTreeMap::new(),
    properties: BTreeMap::new(),
};

/// A catalog resource plus the values bound by the accessors that led to it.
pub struct CatalogResource {
    catalog: Rc<Catalog>,
    transport: Rc<dyn Transport>,
    name: String,
    bindings: Map<String, Value>,
}

impl CatalogResource {
    fn def(&self) -> &ResourceDef {
        // Names only come from validated catalog references.
        self.catalog.resources.get(&self.name).unwrap_or(&EMPTY_DEF)
    }

    fn child(&self, resource: &str, bindings: Map<String, Value>) -> Box<dyn Resource> {
        Box::new(CatalogResource {
            catalog: Rc::clone(&self.catalog),
            transport: Rc::clone(&self.transport),
            name: resource.to_string(),
            bindings,
        })
    }

    /// Turn a method call into a request without sending it.
    pub fn plan(&self, method: &str, args: Vec<Value>) -> Result<ApiRequest> {
        let def = self
            .def()
            .methods
            .get(method)
            .ok_or_else(|| anyhow!("{}.{method}: no such method", self.name))?;

        let mut params = Map::new();
        let mut loose: Vec<Value> = Vec::new();

        if def.opaque {
            for arg in args {
                match arg {
                    Value::Object(map) => params.extend(map),
                    other => loose.push(other),
                }
            }
        } else {
            let mut args = args.into_iter();
            for spec in &def.params {
                let Some(value) = args.next() else { break };
                match value {
                    Value::Null if spec.optional => {}
                    Value::Object(map) if spec.ty.is_array() => params.extend(map),
                    other => {
                        params.insert(spec.name.clone(), other);
                    }
                }
            }
            for extra in args {
                if let Value::Object(map) = extra {
                    params.extend(map);
                } else {
                    tracing::debug!(resource = %self.name, method, "ignoring surplus argument {extra}");
                }
            }
        }

        let path = self.fill_path(method, &def.path, &mut params, &mut loose)?;
        let mut request = ApiRequest::new(def.verb.clone(), path);
        if !loose.is_empty() {
            request.insert_param("args".into(), Value::Array(loose));
        }
        for (k, v) in params {
            request.insert_param(k, v);
        }
        Ok(request)
    }

    fn fill_path(
        &self,
        method: &str,
        template: &str,
        params: &mut Map<String, Value>,
        loose: &mut Vec<Value>,
    ) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            out.push_str(&rest[..start]);
            let key = &rest[start + 1..start + len];
            let value = self
                .bindings
                .get(key)
                .cloned()
                .or_else(|| params.remove(key))
                .or_else(|| params.remove(&to_snake_case(key)))
                .or_else(|| (!loose.is_empty()).then(|| loose.remove(0)));
            match value {
                Some(v) if !v.is_null() => out.push_str(&path_segment(&v)),
                _ => bail!(
                    "{}.{method}: unresolved path parameter '{key}' in {template}",
                    self.name
                ),
            }
            rest = &rest[start + len + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

fn path_segment(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Resource for CatalogResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_method(&self, method: &str) -> bool {
        self.def().methods.contains_key(method)
    }

    fn signature(&self, method: &str) -> Option<Signature> {
        let def = self.def().methods.get(method)?;
        (!def.opaque).then(|| Signature::new(def.params.clone()))
    }

    fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        let request = self.plan(method, args)?;
        self.transport
            .send(&request)
            .with_context(|| format!("{} {} failed", request.verb, request.path))
    }

    fn accessor(&self, name: &str) -> Option<Signature> {
        self.def()
            .accessors
            .get(name)
            .map(|a| Signature::new(a.params.clone()))
    }

    fn open(&self, name: &str, args: Vec<Value>) -> Result<Box<dyn Resource>> {
        let acc = self
            .def()
            .accessors
            .get(name)
            .ok_or_else(|| anyhow!("{}.{name}: no such accessor", self.name))?;
        let mut bindings = self.bindings.clone();
        for (spec, value) in acc.params.iter().zip(args) {
            bindings.insert(spec.name.clone(), value);
        }
        Ok(self.child(&acc.resource, bindings))
    }

    fn property(&self, name: &str) -> Option<Box<dyn Resource>> {
        let target = self.def().properties.get(name)?;
        Some(self.child(target, self.bindings.clone()))
    }

    fn describe(&self) -> ResourceOutline {
        let def = self.def();
        ResourceOutline {
            name: self.name.clone(),
            methods: def
                .methods
                .iter()
                .map(|(n, m)| (n.clone(), Signature::new(m.params.clone())))
                .collect(),
            accessors: def
                .accessors
                .iter()
                .map(|(n, a)| (n.clone(), Signature::new(a.params.clone())))
                .collect(),
            properties: def.properties.keys().cloned().collect(),
        }
    }
}

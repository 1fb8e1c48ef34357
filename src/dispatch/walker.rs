/*!
walker.rs - endpoint path -> target resource.

`leads.notes.create` resolves the root `leads`, then walks every middle
segment (`notes`) to reach the object `create` is called on:

  - accessor with no required parameters -> opened with no arguments
  - accessor with required parameters    -> arguments taken from the named
    bag (exact name, then snake_case), or else from the front of the
    positional list, up to the required count
  - property                             -> read directly

Consumed arguments are removed from the bag so the final method never sees
them.
*/

use serde_json::Value;
use std::fmt;

use super::args::RawArguments;
use super::error::DispatchError;
use crate::registry::{Registry, Resource};
use crate::utils::naming::to_snake_case;

/// What to do when an accessor's required parameters cannot be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Open the accessor with whatever was found; a later failure surfaces
    /// from the call itself.
    #[default]
    Lenient,
    /// Fail with `MissingRequiredArgument`.
    Strict,
}

/// Parsed `resource[.sub...].method` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationPath {
    segments: Vec<String>,
}

impl InvocationPath {
    pub fn parse(endpoint: &str) -> Result<Self, DispatchError> {
        let segments: Vec<String> = endpoint.trim().split('.').map(str::to_string).collect();
        if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
            return Err(DispatchError::InvalidEndpoint(endpoint.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    pub fn method(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    pub fn middle(&self) -> &[String] {
        &self.segments[1..self.segments.len() - 1]
    }
}

impl fmt::Display for InvocationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Resolve the root and walk the middle segments, consuming accessor
/// arguments from `args`.
pub fn walk(
    registry: &dyn Registry,
    path: &InvocationPath,
    args: &mut RawArguments,
    strictness: Strictness,
) -> Result<Box<dyn Resource>, DispatchError> {
    let mut current = registry
        .resolve(path.root())
        .ok_or_else(|| DispatchError::UnknownResource(path.root().to_string()))?;

    for segment in path.middle() {
        current = step(current.as_ref(), segment, args, strictness)?;
        tracing::debug!(segment = %segment, resource = %current.name(), "walked");
    }
    Ok(current)
}

fn step(
    current: &dyn Resource,
    segment: &str,
    args: &mut RawArguments,
    strictness: Strictness,
) -> Result<Box<dyn Resource>, DispatchError> {
    let Some(signature) = current.accessor(segment) else {
        return current
            .property(segment)
            .ok_or_else(|| DispatchError::UnknownMember {
                resource: current.name().to_string(),
                member: segment.to_string(),
            });
    };

    let required = signature.required_count();
    let mut candidates: Vec<Value> = Vec::new();
    if required > 0 {
        let supplied = args.named_keys();
        let mut first_missing: Option<String> = None;
        for param in &signature.params {
            let hit = args
                .take_named(&param.name)
                .or_else(|| args.take_named(&to_snake_case(&param.name)));
            match hit {
                Some(v) => candidates.push(v),
                None if !param.optional && first_missing.is_none() => {
                    first_missing = Some(param.name.clone());
                }
                None => {}
            }
        }
        let missing = if candidates.is_empty() {
            candidates = args.take_positional(required);
            signature
                .params
                .iter()
                .filter(|p| !p.optional)
                .nth(candidates.len())
                .map(|p| p.name.clone())
        } else {
            first_missing
        };
        if let Some(parameter) = missing {
            if strictness == Strictness::Strict {
                return Err(DispatchError::MissingRequiredArgument { parameter, supplied });
            }
            tracing::debug!(
                accessor = %segment,
                missing = %parameter,
                found = candidates.len(),
                "opening accessor with partial arguments"
            );
        }
    }

    current
        .open(segment, candidates)
        .map_err(|source| DispatchError::Invocation {
            endpoint: format!("{}.{segment}", current.name()),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::testing::{MockRegistry, MockResource, leads_registry};
    use crate::registry::{ParamSpec, ParamType};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::path::Path;

    fn args(tokens: &[&str]) -> RawArguments {
        RawArguments::parse_in(tokens, Path::new("/"))
    }

    #[test]
    fn path_needs_two_segments() {
        assert!(InvocationPath::parse("leads").is_err());
        assert!(InvocationPath::parse("leads..create").is_err());
        let p = InvocationPath::parse("leads.notes.create").unwrap();
        assert_eq!(p.root(), "leads");
        assert_eq!(p.middle(), ["notes".to_string()]);
        assert_eq!(p.method(), "create");
        assert_eq!(p.to_string(), "leads.notes.create");
    }

    #[test]
    fn unknown_root_is_resolution_error() {
        let reg = leads_registry();
        let path = InvocationPath::parse("ghosts.list").unwrap();
        let err = walk(&reg, &path, &mut args(&[]), Strictness::Lenient).err().unwrap();
        assert!(matches!(err, DispatchError::UnknownResource(r) if r == "ghosts"));
    }

    #[test]
    fn positional_feeds_accessor() {
        let reg = leads_registry();
        let path = InvocationPath::parse("leads.notes.create").unwrap();
        let mut a = args(&["412", "content=X"]);
        let target = walk(&reg, &path, &mut a, Strictness::Lenient).unwrap();
        assert_eq!(target.name(), "notes(412)");
        assert!(a.positional.is_empty());
        assert_eq!(a.named.get("content"), Some(&json!("X")));
    }

    #[test]
    fn named_snake_case_feeds_accessor() {
        let reg = leads_registry();
        let path = InvocationPath::parse("leads.notes.create").unwrap();
        let mut a = args(&["lead_id=9", "5"]);
        let target = walk(&reg, &path, &mut a, Strictness::Lenient).unwrap();
        assert_eq!(target.name(), "notes(9)");
        assert_eq!(a.positional, vec![json!(5)], "positional untouched when named matched");
        assert!(!a.named.contains_key("lead_id"));
    }

    #[test]
    fn property_segment_is_read_directly() {
        let reg = leads_registry();
        let path = InvocationPath::parse("leads.aggregation.search").unwrap();
        let target = walk(&reg, &path, &mut args(&["7"]), Strictness::Lenient).unwrap();
        assert_eq!(target.name(), "aggregation");
    }

    #[test]
    fn unsatisfied_accessor_is_lenient_by_default() {
        let reg = leads_registry();
        let path = InvocationPath::parse("leads.notes.list").unwrap();
        let target = walk(&reg, &path, &mut args(&[]), Strictness::Lenient).unwrap();
        assert_eq!(target.name(), "notes()");
    }

    #[test]
    fn unsatisfied_accessor_fails_when_strict() {
        let reg = leads_registry();
        let path = InvocationPath::parse("leads.notes.list").unwrap();
        let err = walk(&reg, &path, &mut args(&["x=1"]), Strictness::Strict)
            .err()
            .unwrap();
        match err {
            DispatchError::MissingRequiredArgument { parameter, supplied } => {
                assert_eq!(parameter, "leadId");
                assert_eq!(supplied, vec!["x".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_middle_segment() {
        let reg: MockRegistry = leads_registry();
        let path = InvocationPath::parse("leads.ghost.list").unwrap();
        let err = walk(&reg, &path, &mut args(&[]), Strictness::Lenient).err().unwrap();
        assert!(matches!(err, DispatchError::UnknownMember { member, .. } if member == "ghost"));
    }

    /// `orgs.members(orgId, teamId).list`
    fn orgs_registry() -> MockRegistry {
        let members = MockResource::new("members").method("list", vec![]);
        let orgs = MockResource::new("orgs").accessor(
            "members",
            vec![
                ParamSpec::required("orgId", ParamType::Int),
                ParamSpec::required("teamId", ParamType::Int),
            ],
            members,
        );
        let mut roots = BTreeMap::new();
        roots.insert("orgs".to_string(), orgs);
        MockRegistry { roots }
    }

    #[test]
    fn strict_names_the_parameter_actually_missing() {
        let reg = orgs_registry();
        let path = InvocationPath::parse("orgs.members.list").unwrap();
        let err = walk(&reg, &path, &mut args(&["teamId=5"]), Strictness::Strict)
            .err()
            .unwrap();
        match err {
            DispatchError::MissingRequiredArgument { parameter, supplied } => {
                assert_eq!(parameter, "orgId");
                assert_eq!(supplied, vec!["teamId".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = walk(&reg, &path, &mut args(&["org_id=3"]), Strictness::Strict)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            DispatchError::MissingRequiredArgument { parameter, .. } if parameter == "teamId"
        ));
    }

    #[test]
    fn strict_positional_shortfall_names_next_parameter() {
        let reg = orgs_registry();
        let path = InvocationPath::parse("orgs.members.list").unwrap();
        let err = walk(&reg, &path, &mut args(&["3"]), Strictness::Strict)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            DispatchError::MissingRequiredArgument { parameter, .. } if parameter == "teamId"
        ));

        let target = walk(&reg, &path, &mut args(&["3", "5"]), Strictness::Strict).unwrap();
        assert_eq!(target.name(), "members(3,5)");
    }

    #[test]
    fn lenient_opens_with_the_named_hit() {
        let reg = orgs_registry();
        let path = InvocationPath::parse("orgs.members.list").unwrap();
        let target = walk(&reg, &path, &mut args(&["teamId=5"]), Strictness::Lenient).unwrap();
        assert_eq!(target.name(), "members(5)");
    }
}

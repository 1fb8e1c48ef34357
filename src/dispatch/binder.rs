/*!
binder.rs - fit a loose argument bag onto a method's formal parameters.

Order of operations (each step only runs if the previous ones did not
settle the call):

  1. unknown method                     -> error
  2. empty bag                          -> call with no arguments, unless
                                           a required parameter is declared
  3. `search` + one positional string   -> `search({"search": value})`
  4. signature unavailable              -> positionals, then the named map
  5. positionals fill the leading parameters in order
  6. exactly one parameter left and it is an array -> it takes the named map
  7. remaining parameters, in order:
       exact key, then short-name / camelCase / snake_case alias;
       required and unmatched -> error;
       optional and unmatched -> default, stop matching
  8. leftover named entries go into a trailing array parameter, or are dropped
*/

use serde_json::{Map, Value};

use super::args::RawArguments;
use super::error::DispatchError;
use crate::registry::{Resource, Signature};
use crate::utils::naming::{to_camel_case, to_snake_case};

/// Supplied short key -> parameter names it may stand for.
const SHORT_NAMES: &[(&str, &[&str])] = &[
    (
        "id",
        &["agentId", "leadId", "bloqId", "userId", "noteId", "taskId", "id"],
    ),
    ("agent", &["agentId", "agent_id"]),
    ("lead", &["leadId", "lead_id"]),
    ("bloq", &["bloqId", "bloq_id"]),
    ("user", &["userId", "user_id"]),
];

/// Final positional argument list for one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Binding {
    pub args: Vec<Value>,
    /// Named keys that found no parameter and no array sink.
    pub dropped: Vec<String>,
}

impl Binding {
    fn of(args: Vec<Value>) -> Self {
        Self {
            args,
            dropped: Vec::new(),
        }
    }
}

/// Whether a supplied key may stand for parameter `param`.
pub fn key_matches_param(key: &str, param: &str) -> bool {
    if let Some((_, targets)) = SHORT_NAMES.iter().find(|(short, _)| *short == key)
        && targets.contains(&param)
    {
        return true;
    }
    to_camel_case(key) == param || to_snake_case(key) == param
}

pub fn bind(
    target: &dyn Resource,
    method: &str,
    args: RawArguments,
) -> Result<Binding, DispatchError> {
    if !target.has_method(method) {
        return Err(DispatchError::UnknownMethod {
            resource: target.name().to_string(),
            method: method.to_string(),
        });
    }

    if args.is_empty() {
        if let Some(signature) = target.signature(method)
            && let Some(first) = signature.params.iter().find(|p| !p.optional)
        {
            return Err(DispatchError::MissingRequiredArgument {
                parameter: first.name.clone(),
                supplied: Vec::new(),
            });
        }
        return Ok(Binding::default());
    }

    if method == "search"
        && args.named.is_empty()
        && let [Value::String(term)] = args.positional.as_slice()
    {
        let mut filters = Map::new();
        filters.insert("search".into(), Value::String(term.clone()));
        return Ok(Binding::of(vec![Value::Object(filters)]));
    }

    let RawArguments { positional, named } = args;

    let Some(signature) = target.signature(method) else {
        tracing::debug!(method, "no signature available, binding positionally");
        let mut bound = positional;
        if !named.is_empty() {
            bound.push(Value::Object(named));
        }
        return Ok(Binding::of(bound));
    };

    bind_to_signature(&signature, positional, named)
}

fn bind_to_signature(
    signature: &Signature,
    positional: Vec<Value>,
    mut named: Map<String, Value>,
) -> Result<Binding, DispatchError> {
    let params = &signature.params;
    let supplied: Vec<String> = named.keys().cloned().collect();
    let mut bound = positional;

    if !named.is_empty()
        && params.len().checked_sub(bound.len()) == Some(1)
        && params[bound.len()].ty.is_array()
    {
        bound.push(Value::Object(std::mem::take(&mut named)));
        return Ok(Binding::of(bound));
    }

    // Index of an optional parameter that received its default and ended matching.
    let mut stopped_at: Option<usize> = None;
    for (idx, param) in params.iter().enumerate().skip(bound.len()) {
        if let Some(v) = named.remove(&param.name) {
            bound.push(v);
            continue;
        }
        let alias = named
            .keys()
            .find(|k| key_matches_param(k, &param.name))
            .cloned();
        if let Some(key) = alias
            && let Some(v) = named.remove(&key)
        {
            tracing::trace!(key = %key, param = %param.name, "bound by alias");
            bound.push(v);
            continue;
        }
        if !param.optional {
            return Err(DispatchError::MissingRequiredArgument {
                parameter: param.name.clone(),
                supplied,
            });
        }
        bound.push(param.default_value());
        stopped_at = Some(idx);
        break;
    }

    if named.is_empty() {
        return Ok(Binding::of(bound));
    }

    let Some(last) = params.last().filter(|p| p.ty.is_array()) else {
        return Ok(Binding {
            args: bound,
            dropped: named.keys().cloned().collect(),
        });
    };
    let last_idx = params.len() - 1;

    if bound.len() <= last_idx {
        while bound.len() < last_idx {
            bound.push(params[bound.len()].default_value());
        }
        bound.push(Value::Object(named));
    } else if stopped_at == Some(last_idx) {
        // The sink only holds its default: fold the leftovers into it.
        let mut sink = match last.default_value() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        sink.extend(named);
        bound[last_idx] = Value::Object(sink);
    } else {
        return Ok(Binding {
            args: bound,
            dropped: named.keys().cloned().collect(),
        });
    }
    Ok(Binding::of(bound))
}

/*!
`describe.rs`

Implements `iris describe <endpoint>`: walks to the endpoint without calling
it and shows the formal parameters, accepted argument aliases and whether the
current user id will be injected.

JSON Output Shape:
{
  "status": "ok",
  "endpoint": "leads.notes.create",
  "resource": "lead_notes",
  "introspectable": true,
  "params": [ { "name": "content", "type": "string", "optional": false }, ... ],
  "aliases": { "note": "content" },
  "scoped": true
}
*/

use anyhow::Result;
use clap::Args;
use serde_json::{Value, json};

use crate::cmd::format::{
    Role, StyleOptions, TableOpts, box_header, color, definition_list, emoji, table,
};
use crate::cmd::shared::{GlobalOpts, Session, print_json, report_failure};
use crate::dispatch::output::cell_text;
use crate::dispatch::{DispatchError, Dispatcher, InvocationPath};

#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Endpoint path: resource[.sub...].method
    #[arg(value_name = "ENDPOINT")]
    pub endpoint: String,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute_describe(args: DescribeArgs, global: &GlobalOpts) -> Result<()> {
    let described = Session::open(global)
        .and_then(|session| Ok(describe(&session.dispatcher, &args.endpoint)?));
    let info = match described {
        Ok(info) => info,
        Err(err) => return Err(report_failure("Describe Failed", err, args.json, global.verbose)),
    };

    if args.json {
        let mut out = json!({ "status": "ok" });
        if let (Value::Object(base), Value::Object(extra)) = (&mut out, info) {
            base.extend(extra);
        }
        print_json(&out);
        return Ok(());
    }

    let style = StyleOptions::detect();
    println!(
        "{}",
        box_header(
            format!("{} {}", emoji("info", &style), info["endpoint"].as_str().unwrap_or_default()),
            Some(format!("resource {}", cell_text(&info["resource"]))),
            &style
        )
    );

    match info["params"].as_array() {
        None => println!(
            "{}",
            color(Role::Dim, "signature not introspectable: arguments pass through positionally", &style)
        ),
        Some(params) if params.is_empty() => {
            println!("{}", color(Role::Dim, "takes no parameters", &style))
        }
        Some(params) => {
            let rows: Vec<Vec<String>> = params
                .iter()
                .map(|p| {
                    vec![
                        cell_text(&p["name"]),
                        cell_text(&p["type"]),
                        String::from(if p["optional"] == json!(true) { "no" } else { "yes" }),
                        cell_text(&p["default"]),
                    ]
                })
                .collect();
            println!(
                "{}",
                table(&["NAME", "TYPE", "REQUIRED", "DEFAULT"], &rows, TableOpts::default(), &style)
            );
        }
    }

    let mut facts = vec![(
        "user scope".to_string(),
        String::from(if info["scoped"] == json!(true) { "injected" } else { "global" }),
    )];
    if let Some(aliases) = info["aliases"].as_object().filter(|a| !a.is_empty()) {
        let listed: Vec<String> = aliases
            .iter()
            .map(|(alias, canonical)| format!("{alias}->{}", cell_text(canonical)))
            .collect();
        facts.push(("aliases".to_string(), listed.join(" ")));
    }
    println!();
    println!("{}", definition_list(&facts, &style));
    Ok(())
}

/// Static description of `endpoint`.
pub fn describe(dispatcher: &Dispatcher, endpoint: &str) -> Result<Value, DispatchError> {
    let key = InvocationPath::parse(endpoint)?.to_string();
    let (resource, signature) = dispatcher.signature_of(&key)?;
    let policy = dispatcher.policy();

    Ok(json!({
        "endpoint": key,
        "resource": resource,
        "introspectable": signature.is_some(),
        "params": signature.map(|s| s.params),
        "aliases": policy.aliases_for(&key).cloned().unwrap_or_default(),
        "scoped": !policy.is_global(&key),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::testing::leads_registry;
    use crate::dispatch::{DispatchOptions, Policy};

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            Box::new(leads_registry()),
            Policy::builtin().unwrap(),
            DispatchOptions::default(),
        )
    }

    #[test]
    fn nested_endpoint_lists_params_and_aliases() {
        let info = describe(&dispatcher(), "leads.notes.create").unwrap();
        assert_eq!(info["introspectable"], json!(true));
        assert_eq!(info["params"][0]["name"], json!("content"));
        assert_eq!(info["params"][1]["default"], json!("note"));
        assert_eq!(info["aliases"]["note"], json!("content"));
        assert_eq!(info["scoped"], json!(true));
    }

    #[test]
    fn global_and_opaque_endpoints() {
        let d = dispatcher();
        assert_eq!(describe(&d, "leads.search").unwrap()["scoped"], json!(false));
        let raw = describe(&d, "leads.raw").unwrap();
        assert_eq!(raw["introspectable"], json!(false));
        assert_eq!(raw["params"], Value::Null);
    }

    #[test]
    fn unknown_members_are_resolution_errors() {
        let d = dispatcher();
        assert!(matches!(
            describe(&d, "leads.nope.list"),
            Err(DispatchError::UnknownMember { .. })
        ));
        assert!(matches!(describe(&d, "ghosts.list"), Err(DispatchError::UnknownResource(_))));
    }
}

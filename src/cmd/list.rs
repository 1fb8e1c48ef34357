/*!
`list.rs`

Implements `iris list <resources|endpoints|aliases|globals>`.

  - resources : root resources from the registry, with member names
  - endpoints : every endpoint reachable in the catalog, its signature and
                whether the current user id is injected into it
  - aliases   : alias -> canonical argument names per endpoint
  - globals   : endpoints exempt from user scoping

JSON Output Shape:
{
  "status": "ok",
  "subject": "endpoints",
  "count": 2,
  "items": [ { "endpoint": "leads.get", "signature": "leadId:int", "scoped": true }, ... ]
}
*/

use anyhow::Result;
use clap::Args;
use serde_json::{Value, json};

use crate::cmd::format::{StyleOptions, TableOpts, box_header, emoji, table};
use crate::cmd::shared::{GlobalOpts, Session, print_json, report_failure};
use crate::cmd::subject::Subject;
use crate::dispatch::Dispatcher;
use crate::dispatch::output::cell_text;
use crate::registry::Catalog;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// What to list (resources|endpoints|aliases|globals)
    pub subject: Subject,

    /// Output JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn execute_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let session = match Session::open(global) {
        Ok(s) => s,
        Err(err) => return Err(report_failure("List Failed", err, args.json, global.verbose)),
    };
    let items = entries(args.subject, &session.catalog, &session.dispatcher);

    if args.json {
        print_json(&json!({
            "status": "ok",
            "subject": args.subject.as_str(),
            "count": items.len(),
            "items": items,
        }));
        return Ok(());
    }

    let style = StyleOptions::detect();
    let columns = columns(args.subject);
    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|item| columns.iter().map(|c| cell_text(&item[*c])).collect())
        .collect();

    if !global.quiet {
        println!(
            "{}",
            box_header(
                format!("{} {}", emoji("list", &style), args.subject),
                Some(format!("{} entries", rows.len())),
                &style
            )
        );
    }
    let headers: Vec<String> = columns.iter().map(|c| c.to_ascii_uppercase()).collect();
    println!("{}", table(&headers, &rows, TableOpts::default(), &style));
    Ok(())
}

fn columns(subject: Subject) -> &'static [&'static str] {
    match subject {
        Subject::Resources => &["resource", "methods", "accessors", "properties"],
        Subject::Endpoints => &["endpoint", "signature", "scoped"],
        Subject::Aliases => &["endpoint", "alias", "canonical"],
        Subject::Globals => &["endpoint"],
    }
}

/// One JSON object per listed entry, keyed by `columns(subject)`.
pub fn entries(subject: Subject, catalog: &Catalog, dispatcher: &Dispatcher) -> Vec<Value> {
    let policy = dispatcher.policy();
    match subject {
        Subject::Resources => {
            let registry = dispatcher.registry();
            registry
                .roots()
                .iter()
                .filter_map(|root| registry.resolve(root))
                .map(|resource| {
                    let outline = resource.describe();
                    json!({
                        "resource": outline.name,
                        "methods": outline.methods.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>().join(" "),
                        "accessors": outline
                            .accessors
                            .iter()
                            .map(|(n, sig)| format!("{n}({})", sig.summary()))
                            .collect::<Vec<_>>()
                            .join(" "),
                        "properties": outline.properties.join(" "),
                    })
                })
                .collect()
        }
        Subject::Endpoints => catalog
            .endpoints()
            .into_iter()
            .map(|(endpoint, sig)| {
                json!({
                    "signature": sig.map(|s| s.summary()).unwrap_or_else(|| "(opaque)".to_string()),
                    "scoped": !policy.is_global(&endpoint),
                    "endpoint": endpoint,
                })
            })
            .collect(),
        Subject::Aliases => policy
            .aliases
            .iter()
            .flat_map(|(endpoint, table)| {
                table.iter().map(move |(alias, canonical)| {
                    json!({ "endpoint": endpoint, "alias": alias, "canonical": canonical })
                })
            })
            .collect(),
        Subject::Globals => policy
            .global_endpoints
            .iter()
            .map(|endpoint| json!({ "endpoint": endpoint }))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::testing::leads_registry;
    use crate::dispatch::{DispatchOptions, Policy};

    fn fixtures() -> (Catalog, Dispatcher) {
        let dispatcher = Dispatcher::new(
            Box::new(leads_registry()),
            Policy::builtin().unwrap(),
            DispatchOptions::default(),
        );
        (Catalog::builtin().unwrap(), dispatcher)
    }

    #[test]
    fn resources_come_from_registry_outlines() {
        let (catalog, d) = fixtures();
        let items = entries(Subject::Resources, &catalog, &d);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["resource"], json!("leads"));
        assert_eq!(items[0]["accessors"], json!("notes(leadId:int)"));
        assert_eq!(items[0]["properties"], json!("aggregation"));
    }

    #[test]
    fn endpoints_report_scoping() {
        let (catalog, d) = fixtures();
        let items = entries(Subject::Endpoints, &catalog, &d);
        let find = |name: &str| items.iter().find(|i| i["endpoint"] == json!(name)).cloned();

        let search = find("leads.search").unwrap();
        assert_eq!(search["scoped"], json!(false));
        let notes = find("leads.notes.create").unwrap();
        assert_eq!(notes["scoped"], json!(true));
        assert!(notes["signature"].as_str().unwrap().starts_with("content:string"));
        assert_eq!(find("tools.execute").unwrap()["signature"], json!("(opaque)"));
    }

    #[test]
    fn aliases_and_globals_come_from_policy() {
        let (catalog, d) = fixtures();
        let aliases = entries(Subject::Aliases, &catalog, &d);
        assert!(aliases.contains(&json!({
            "endpoint": "agents.chat", "alias": "prompt", "canonical": "message"
        })));
        let globals = entries(Subject::Globals, &catalog, &d);
        assert!(globals.contains(&json!({ "endpoint": "profile.get" })));
    }
}

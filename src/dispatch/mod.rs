/*!
Dynamic invocation resolver.

Turns `resource[.sub...].method` plus loose CLI tokens into one call
against a resource with a fixed signature:

  tokens --args--> RawArguments
         --policy--> aliases applied, user_id injected (unless global)
         --walker--> target resource (accessor arguments consumed)
         --binder--> ordered argument list
         --invoke--> Value

One call chain per dispatch. Nothing is retried; a failing target call is
returned as `DispatchError::Invocation` with its original error attached.
*/

pub mod args;
pub mod binder;
pub mod error;
pub mod output;
pub mod policy;
pub mod walker;

#[cfg(test)]
pub mod testing;

use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use crate::registry::{Registry, Signature};

pub use args::RawArguments;
pub use binder::Binding;
pub use error::DispatchError;
pub use policy::Policy;
pub use walker::{InvocationPath, Strictness};

/// Per-process dispatch settings.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    pub current_user_id: Option<i64>,
    pub strictness: Strictness,
    /// Base directory for `@file` arguments.
    pub cwd: PathBuf,
}

/// Result of a completed dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct Dispatched {
    pub endpoint: String,
    pub arguments: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<String>,
    pub user_scoped: bool,
    pub value: Value,
}

pub struct Dispatcher {
    registry: Box<dyn Registry>,
    policy: Policy,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(registry: Box<dyn Registry>, policy: Policy, options: DispatchOptions) -> Self {
        Self {
            registry,
            policy,
            options,
        }
    }

    pub fn registry(&self) -> &dyn Registry {
        self.registry.as_ref()
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Parse raw CLI tokens and dispatch.
    pub fn dispatch<I, S>(&self, endpoint: &str, tokens: I) -> Result<Dispatched, DispatchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args = RawArguments::parse_in(tokens, &self.options.cwd);
        self.dispatch_args(endpoint, args)
    }

    pub fn dispatch_args(
        &self,
        endpoint: &str,
        mut args: RawArguments,
    ) -> Result<Dispatched, DispatchError> {
        let path = InvocationPath::parse(endpoint)?;
        let key = path.to_string();

        for (alias, canonical) in self.policy.apply_aliases(&key, &mut args) {
            tracing::debug!(endpoint = %key, "alias {alias} -> {canonical}");
        }
        let user_scoped =
            self.policy
                .inject_user_scope(&key, &mut args, self.options.current_user_id);
        if user_scoped {
            tracing::debug!(endpoint = %key, "scoped to current user");
        }

        let target = walker::walk(
            self.registry.as_ref(),
            &path,
            &mut args,
            self.options.strictness,
        )?;
        let Binding { args: bound, dropped } = binder::bind(target.as_ref(), path.method(), args)?;
        if !dropped.is_empty() {
            tracing::debug!(endpoint = %key, ?dropped, "unused named arguments dropped");
        }
        let shown = Value::Array(bound.clone());
        tracing::debug!(endpoint = %key, arguments = %shown, "invoking");

        let value = target
            .invoke(path.method(), bound.clone())
            .map_err(|source| DispatchError::Invocation {
                endpoint: key.clone(),
                source,
            })?;

        Ok(Dispatched {
            endpoint: key,
            arguments: bound,
            dropped,
            user_scoped,
            value,
        })
    }

    /// Walk to an endpoint without calling it and report the owning
    /// resource and the method signature (`None` when not introspectable).
    pub fn signature_of(&self, endpoint: &str) -> Result<(String, Option<Signature>), DispatchError> {
        let path = InvocationPath::parse(endpoint)?;
        let mut args = RawArguments::default();
        let target = walker::walk(self.registry.as_ref(), &path, &mut args, Strictness::Lenient)?;
        if !target.has_method(path.method()) {
            return Err(DispatchError::UnknownMethod {
                resource: target.name().to_string(),
                method: path.method().to_string(),
            });
        }
        Ok((target.name().to_string(), target.signature(path.method())))
    }
}

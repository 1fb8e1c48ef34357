// Dispatcher error taxonomy.
//
//   resolution  : InvalidEndpoint, UnknownResource, UnknownMember, UnknownMethod
//   binding     : MissingRequiredArgument
//   invocation  : Invocation (whatever the target call returned, untouched)

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid endpoint '{0}': expected resource.method (e.g. leads.search)")]
    InvalidEndpoint(String),

    #[error("unknown resource '{0}'")]
    UnknownResource(String),

    #[error("resource '{resource}' has no sub-resource or accessor '{member}'")]
    UnknownMember { resource: String, member: String },

    #[error("method '{method}' not found on resource '{resource}'")]
    UnknownMethod { resource: String, method: String },

    #[error(
        "missing required parameter '{parameter}'; provided parameters: [{}]",
        .supplied.join(", ")
    )]
    MissingRequiredArgument {
        parameter: String,
        supplied: Vec<String>,
    },

    #[error("{endpoint} failed")]
    Invocation {
        endpoint: String,
        #[source]
        source: anyhow::Error,
    },
}

impl DispatchError {
    /// Errors caused by how the call was written rather than by the target.
    pub fn is_usage(&self) -> bool {
        !matches!(self, DispatchError::Invocation { .. })
    }
}

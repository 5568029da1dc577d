//! Operation and execution-result types exchanged with the host server.
//!
//! The cache never parses or executes GraphQL itself; it only needs the
//! operation kind, the raw document text, the variable values, and the
//! result tree the downstream executor produced.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of GraphQL operation, as classified by the host server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    /// The conventional root type name used to attribute top-level
    /// schema coordinates in a result tree.
    pub fn root_type_name(&self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
            OperationKind::Subscription => "Subscription",
        }
    }
}

/// A GraphQL operation as received from the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    /// Raw document text, fingerprinted verbatim.
    pub document: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    /// Variable values as sent by the client. `Null` when absent.
    #[serde(default)]
    pub variables: Value,
}

impl Operation {
    pub fn query(document: impl Into<String>) -> Self {
        Self::new(OperationKind::Query, document)
    }

    pub fn mutation(document: impl Into<String>) -> Self {
        Self::new(OperationKind::Mutation, document)
    }

    pub fn new(kind: OperationKind, document: impl Into<String>) -> Self {
        Self {
            kind,
            document: document.into(),
            operation_name: None,
            variables: Value::Null,
        }
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// The result tree produced by the downstream executor.
///
/// Errors are kept opaque; the cache only cares whether any are present,
/// since responses carrying errors are never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Value>,
}

impl ExecutionResult {
    /// A successful result with no errors.
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            errors: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

//! Source instrumentation.
//!
//! Rewrites a parsed unit so the running program reports its own execution:
//! an entry hook on the entry method, a variable hook after every traced
//! declaration or assignment, optional return hooks, and the runtime members
//! those hooks call.

pub mod instrumenter;
pub mod plan;
pub mod shim;

pub use instrumenter::instrument;
pub use plan::{build_plan, InstrumentationPlan, PlanSummary};

use crate::syntax::CompilationUnit;
use serde::{Deserialize, Serialize};

/// How the runtime turns a value into text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ValuePolicy {
    /// Arrays rendered element by element, nested arrays included
    #[default]
    Deep,
    /// `String.valueOf` for everything
    Identity,
}

/// What to instrument and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentOptions {
    /// Class that receives the runtime; hooks are qualified with it
    pub class_name: String,
    pub entry_method: String,
    pub value_policy: ValuePolicy,
    /// Wrap `return <expr>;` in entry methods
    pub trace_returns: bool,
}

impl InstrumentOptions {
    pub fn new(class_name: impl Into<String>, entry_method: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            entry_method: entry_method.into(),
            value_policy: ValuePolicy::default(),
            trace_returns: false,
        }
    }

    pub fn with_value_policy(mut self, value_policy: ValuePolicy) -> Self {
        self.value_policy = value_policy;
        self
    }

    pub fn with_trace_returns(mut self, trace_returns: bool) -> Self {
        self.trace_returns = trace_returns;
        self
    }
}

/// Result of a successful instrumentation
#[derive(Debug, Clone)]
pub struct Instrumented {
    pub unit: CompilationUnit,
    /// Printed source, ready for the compiler
    pub source: String,
    pub plan_summary: PlanSummary,
    /// Dotted path of the designated class from its top-level type
    pub qualifier: String,
}

impl Instrumented {
    /// Binary name of the designated class, as the runtime expects it
    pub fn main_class(&self) -> String {
        self.unit.qualified_name(&self.qualifier.replace('.', "$"))
    }

    /// File stem the compiler accepts: the public top-level type if there is
    /// one, otherwise the top-level type holding the designated class
    pub fn file_stem(&self) -> &str {
        self.unit
            .types
            .iter()
            .find(|decl| decl.modifiers.has("public"))
            .map(|decl| decl.name.as_str())
            .unwrap_or_else(|| self.qualifier.split('.').next().unwrap_or(&self.qualifier))
    }
}

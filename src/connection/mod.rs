pub mod config;

use crate::core::{GraphError, Result};
use crate::persist::Statement;
use async_trait::async_trait;
use config::MapperConfig;
use serde_json::Value as Json;
use tracing::{Level, event};

/// Transport that runs a synthesized statement against the graph store.
///
/// Retries, timeouts and cancellation are the transport's business.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    /// Executes `statement` and returns the result rows as raw JSON.
    async fn execute(&self, statement: &Statement) -> Result<Vec<Json>>;
}

/// Injected sink for query diagnostics.
pub trait QueryDiagnostics: Send + Sync {
    /// A statement is about to be sent.
    fn query(&self, statement: &Statement);

    /// A statement failed in the transport.
    fn failed_query(&self, statement: &Statement, error: &GraphError);
}

/// [`QueryDiagnostics`] writing `tracing` events, gated by the connector flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TracingDiagnostics {
    output_all_queries: bool,
    output_debug_log: bool,
}

impl TracingDiagnostics {
    pub fn new(output_all_queries: bool, output_debug_log: bool) -> Self {
        Self {
            output_all_queries,
            output_debug_log,
        }
    }

    pub fn from_config(config: &MapperConfig) -> Self {
        Self::new(config.output_all_queries, config.output_debug_log)
    }

    pub fn logs_all_queries(&self) -> bool {
        self.output_all_queries
    }

    pub fn logs_failures(&self) -> bool {
        self.output_debug_log
    }
}

impl QueryDiagnostics for TracingDiagnostics {
    fn query(&self, statement: &Statement) {
        if self.output_all_queries {
            event!(
                Level::DEBUG,
                statement = %statement,
                parameters = %statement.parameters_json(),
                "graph query"
            );
        }
    }

    fn failed_query(&self, statement: &Statement, error: &GraphError) {
        if self.output_debug_log {
            event!(
                Level::ERROR,
                statement = %statement,
                parameters = %statement.parameters_json(),
                error = %error,
                "graph query failed"
            );
        }
    }
}

//! Operation execution and timing.

use std::time::Instant;

use crate::catalog::CatalogSession;
use crate::ops::Operation;
use crate::{BenchResult, Measurement};

/// Runs operations against a session, one wall-clock measurement per
/// operation. Engine failures become failed measurements so the unit
/// can keep going; invariant errors are never absorbed.
pub struct OperationRunner {
    audit: Vec<String>,
}

impl OperationRunner {
    pub fn new() -> Self {
        Self { audit: Vec::new() }
    }

    pub fn execute(
        &mut self,
        session: &mut dyn CatalogSession,
        op: &Operation,
    ) -> BenchResult<Measurement> {
        let started = Instant::now();
        match session.execute(&op.statement) {
            Ok(rows) => {
                let duration = started.elapsed();
                tracing::debug!(
                    operation = %op.name,
                    statement = %op.statement.summary(),
                    rows,
                    secs = duration.as_secs_f64(),
                    "operation ok"
                );
                self.audit.push(format!(
                    "{}: ok, {} rows, {:.3}s",
                    op.name,
                    rows,
                    duration.as_secs_f64()
                ));
                Ok(Measurement::success(&op.name, duration))
            }
            Err(e) if e.is_invariant() => Err(e),
            Err(e) => {
                let duration = started.elapsed();
                let text = e.to_string();
                tracing::warn!(operation = %op.name, error = %text, "operation failed");
                self.audit
                    .push(format!("{}: FAILED after {:.3}s: {}", op.name, duration.as_secs_f64(), text));
                Ok(Measurement::failure(&op.name, duration, text))
            }
        }
    }

    pub fn audit_log(&self) -> &[String] {
        &self.audit
    }

    pub fn take_audit(&mut self) -> Vec<String> {
        std::mem::take(&mut self.audit)
    }
}

impl Default for OperationRunner {
    fn default() -> Self {
        Self::new()
    }
}

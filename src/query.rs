//! jq-compatible query evaluation with a compile-once cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use jaq_interpret::{Ctx, Filter, FilterT, ParseCtx, RcIter, Val};
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::QueryError;

/// Compiled queries keyed by their literal text.
///
/// One cache lives for the whole process run and is shared by every
/// consumer. Entries are never evicted.
#[derive(Default)]
pub struct QueryCache {
    compiled: RwLock<HashMap<String, Arc<Filter>>>,
    compilations: AtomicUsize,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `query` against `data` and return every output value in order.
    pub fn evaluate(&self, query: &str, data: &Value) -> Result<Vec<Value>, QueryError> {
        let compiled = self.compiled(query)?;
        let filter: &Filter = &compiled;
        let inputs = RcIter::new(core::iter::empty());
        let values: Result<Vec<Value>, QueryError> = filter
            .run((Ctx::new([], &inputs), Val::from(data.clone())))
            .map(|output| {
                output
                    .map(Value::from)
                    .map_err(|e| QueryError::Runtime(e.to_string()))
            })
            .collect();
        values
    }

    /// How many distinct queries have been compiled so far.
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.compiled.read().is_empty()
    }

    fn compiled(&self, query: &str) -> Result<Arc<Filter>, QueryError> {
        if let Some(filter) = self.compiled.read().get(query) {
            return Ok(Arc::clone(filter));
        }

        let mut cache = self.compiled.write();
        // Another caller may have compiled it between the two locks
        if let Some(filter) = cache.get(query) {
            return Ok(Arc::clone(filter));
        }
        let filter = Arc::new(compile(query)?);
        self.compilations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(query, "compiled query");
        cache.insert(query.to_string(), Arc::clone(&filter));
        Ok(filter)
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.compiled.read().len())
            .field("compilations", &self.compilations())
            .finish()
    }
}

fn compile(query: &str) -> Result<Filter, QueryError> {
    let mut defs = ParseCtx::new(Vec::new());
    defs.insert_natives(jaq_core::core());
    defs.insert_defs(jaq_std::std());

    let (main, errs) = jaq_parse::parse(query, jaq_parse::main());
    let main = match main {
        Some(main) if errs.is_empty() => main,
        _ if errs.is_empty() => return Err(QueryError::Parse("incomplete query".to_string())),
        _ => {
            let problems: Vec<String> = errs
                .iter()
                .map(|e| format!("{e} at offset {}", e.span().start))
                .collect();
            return Err(QueryError::Parse(problems.join("; ")));
        }
    };

    let filter = defs.compile(main);
    if !defs.errs.is_empty() {
        let problems: Vec<String> = defs
            .errs
            .iter()
            .map(|(e, span)| format!("{e} '{}'", snippet(query, span)))
            .collect();
        return Err(QueryError::Compile(problems.join("; ")));
    }
    Ok(filter)
}

/// Source text under a span. jaq spans count chars, not bytes.
fn snippet(query: &str, span: &std::ops::Range<usize>) -> String {
    query
        .chars()
        .skip(span.start)
        .take(span.end.saturating_sub(span.start))
        .collect()
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;

//! Scripted database backend for testing.
//!
//! Returns predefined outcomes and counts how often connections were opened,
//! used and closed, so lifecycle guarantees can be checked without a server.

use super::{ConnectionParameters, Connector, FieldDescriptor, RawResult, Session, Value};
use crate::classify::RawFailure;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// What a scripted step does when called.
#[derive(Debug, Clone)]
pub enum SessionScript<T> {
    /// Succeed with the value.
    Succeed(T),
    /// Fail with the raw failure.
    Fail(RawFailure),
    /// Panic with the message.
    Panic(String),
}

impl<T: Clone> SessionScript<T> {
    fn play(&self) -> std::result::Result<T, RawFailure> {
        match self {
            Self::Succeed(value) => Ok(value.clone()),
            Self::Fail(failure) => Err(failure.clone()),
            Self::Panic(message) => panic!("{}", message),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    opens: AtomicUsize,
    runs: AtomicUsize,
    closes: AtomicUsize,
}

/// A connector whose sessions follow a fixed script.
#[derive(Debug, Clone)]
pub struct ScriptedConnector {
    open: SessionScript<()>,
    run: SessionScript<RawResult>,
    close: SessionScript<()>,
    counters: Arc<Counters>,
}

impl ScriptedConnector {
    /// Creates a connector whose statements return `result`.
    pub fn returning(result: RawResult) -> Self {
        Self {
            open: SessionScript::Succeed(()),
            run: SessionScript::Succeed(result),
            close: SessionScript::Succeed(()),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Creates a connector whose statements return `SELECT 1 AS one`.
    pub fn select_one() -> Self {
        Self::returning(RawResult {
            command: Some("SELECT".to_string()),
            fields: vec![FieldDescriptor::new("one", "INT4", 0)],
            rows: vec![vec![Value::Int(1)]],
            row_count: Some(1),
        })
    }

    /// Creates a connector whose statements fail with `failure`.
    pub fn failing(failure: RawFailure) -> Self {
        Self::select_one().with_run(SessionScript::Fail(failure))
    }

    pub fn with_open(mut self, script: SessionScript<()>) -> Self {
        self.open = script;
        self
    }

    pub fn with_run(mut self, script: SessionScript<RawResult>) -> Self {
        self.run = script;
        self
    }

    pub fn with_close(mut self, script: SessionScript<()>) -> Self {
        self.close = script;
        self
    }

    /// Number of connections opened (attempts, including failed ones).
    pub fn opens(&self) -> usize {
        self.counters.opens.load(Ordering::SeqCst)
    }

    /// Number of statements submitted.
    pub fn runs(&self) -> usize {
        self.counters.runs.load(Ordering::SeqCst)
    }

    /// Number of close attempts.
    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn open(
        &self,
        _params: &ConnectionParameters,
    ) -> std::result::Result<Box<dyn Session>, RawFailure> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        self.open.play()?;
        Ok(Box::new(ScriptedSession {
            run: self.run.clone(),
            close: self.close.clone(),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct ScriptedSession {
    run: SessionScript<RawResult>,
    close: SessionScript<()>,
    counters: Arc<Counters>,
}

#[async_trait]
impl Session for ScriptedSession {
    async fn run(&mut self, _statement: &str) -> std::result::Result<RawResult, RawFailure> {
        self.counters.runs.fetch_add(1, Ordering::SeqCst);
        self.run.play()
    }

    async fn close(self: Box<Self>) -> std::result::Result<(), RawFailure> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        self.close.play()
    }
}

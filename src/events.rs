//! Client events fired around every statement or batch send.
//!
//! Listeners are registered on the [`ClientBuilder`](crate::ClientBuilder)
//! before the client exists, so the table is immutable once dispatch starts.
//! Each listener receives a borrowed, read-only payload and answers with a
//! [`ListenerDecision`]; only failure listeners' decisions are acted upon.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::GraphMiddlewareError;
use crate::results::ResultCollection;
use crate::statement::Statement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PreRun,
    PostRun,
    Failure,
}

impl EventKind {
    pub const PRE_RUN: &'static str = "graph.pre_run";
    pub const POST_RUN: &'static str = "graph.post_run";
    pub const ON_FAILURE: &'static str = "graph.on_failure";

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            EventKind::PreRun => Self::PRE_RUN,
            EventKind::PostRun => Self::POST_RUN,
            EventKind::Failure => Self::ON_FAILURE,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = GraphMiddlewareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::PRE_RUN => Ok(EventKind::PreRun),
            Self::POST_RUN => Ok(EventKind::PostRun),
            Self::ON_FAILURE => Ok(EventKind::Failure),
            other => Err(GraphMiddlewareError::ConfigError(format!(
                "unknown event \"{other}\""
            ))),
        }
    }
}

/// Payload handed to listeners.
#[derive(Debug, Clone, Copy)]
pub enum ClientEvent<'a> {
    /// Statements about to be handed to the session.
    PreRun { statements: &'a [Statement] },
    /// Results of a successful send.
    PostRun { results: &'a ResultCollection },
    /// Transport-level failure raised by the session.
    Failure { error: &'a GraphMiddlewareError },
}

impl ClientEvent<'_> {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            ClientEvent::PreRun { .. } => EventKind::PreRun,
            ClientEvent::PostRun { .. } => EventKind::PostRun,
            ClientEvent::Failure { .. } => EventKind::Failure,
        }
    }
}

/// What a listener wants done after seeing an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenerDecision {
    #[default]
    Continue,
    /// Swallow the failure; the call returns `Ok(None)` instead of the error.
    SuppressError,
}

pub type Listener = Arc<dyn Fn(&ClientEvent<'_>) -> ListenerDecision + Send + Sync>;

/// Outcome of dispatching a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureOutcome {
    pub should_throw: bool,
}

/// Listener table keyed by event kind, dispatched in registration order.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    listeners: HashMap<EventKind, Vec<Listener>>,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<_, _> = self
            .listeners
            .iter()
            .map(|(kind, listeners)| (kind.name(), listeners.len()))
            .collect();
        f.debug_struct("EventDispatcher")
            .field("listeners", &counts)
            .finish()
    }
}

impl EventDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener<F>(&mut self, kind: EventKind, listener: F)
    where
        F: Fn(&ClientEvent<'_>) -> ListenerDecision + Send + Sync + 'static,
    {
        self.add_shared_listener(kind, Arc::new(listener));
    }

    pub fn add_shared_listener(&mut self, kind: EventKind, listener: Listener) {
        self.listeners.entry(kind).or_default().push(listener);
    }

    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }

    /// Call every listener for the event's kind; returns their decisions in order.
    pub fn dispatch(&self, event: &ClientEvent<'_>) -> Vec<ListenerDecision> {
        self.listeners
            .get(&event.kind())
            .map(|listeners| listeners.iter().map(|listener| listener(event)).collect())
            .unwrap_or_default()
    }

    pub fn pre_run(&self, statements: &[Statement]) {
        self.dispatch(&ClientEvent::PreRun { statements });
    }

    pub fn post_run(&self, results: &ResultCollection) {
        self.dispatch(&ClientEvent::PostRun { results });
    }

    /// Every failure listener runs; any one of them may suppress the error.
    pub fn failure(&self, error: &GraphMiddlewareError) -> FailureOutcome {
        let suppressed = self
            .dispatch(&ClientEvent::Failure { error })
            .contains(&ListenerDecision::SuppressError);
        FailureOutcome {
            should_throw: !suppressed,
        }
    }

    /// Run a send wrapped in PreRun / PostRun / Failure.
    ///
    /// `Ok(None)` means a transport failure was suppressed by a listener.
    /// Non-transport errors skip the failure event and propagate unchanged.
    pub(crate) async fn around_send<T, F, R>(
        &self,
        statements: &[Statement],
        send: F,
        results_of: R,
    ) -> Result<Option<T>, GraphMiddlewareError>
    where
        F: std::future::Future<Output = Result<T, GraphMiddlewareError>>,
        R: FnOnce(&T) -> ResultCollection,
    {
        self.pre_run(statements);
        match send.await {
            Ok(value) => {
                if self.listener_count(EventKind::PostRun) > 0 {
                    self.post_run(&results_of(&value));
                }
                Ok(Some(value))
            }
            Err(err) => self.handle_failure(err).map(|()| None),
        }
    }

    /// Route an error through the failure listeners; `Ok(())` means suppressed.
    pub(crate) fn handle_failure(
        &self,
        err: GraphMiddlewareError,
    ) -> Result<(), GraphMiddlewareError> {
        if !err.is_transport() {
            return Err(err);
        }
        if self.failure(&err).should_throw {
            return Err(err);
        }
        tracing::warn!(error = %err, "transport failure suppressed by listener");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportFailure;
    use std::sync::Mutex;

    #[test]
    fn names_round_trip() {
        for kind in [EventKind::PreRun, EventKind::PostRun, EventKind::Failure] {
            assert_eq!(kind.name().parse::<EventKind>().unwrap(), kind);
        }
        assert!("graph.nope".parse::<EventKind>().is_err());
    }

    #[test]
    fn dispatch_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();
        for n in 0..3 {
            let seen = Arc::clone(&seen);
            dispatcher.add_listener(EventKind::PreRun, move |_| {
                seen.lock().unwrap().push(n);
                ListenerDecision::Continue
            });
        }
        dispatcher.pre_run(&[Statement::new("RETURN 1")]);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn any_failure_listener_can_suppress() {
        let mut dispatcher = EventDispatcher::new();
        let err: GraphMiddlewareError =
            TransportFailure::new("Neo.ClientError.General.X", "boom").into();
        assert!(dispatcher.failure(&err).should_throw);

        dispatcher.add_listener(EventKind::Failure, |_| ListenerDecision::Continue);
        dispatcher.add_listener(EventKind::Failure, |_| ListenerDecision::SuppressError);
        assert!(!dispatcher.failure(&err).should_throw);
        assert!(dispatcher.handle_failure(err).is_ok());
    }

    #[test]
    fn non_transport_errors_never_reach_listeners() {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_listener(EventKind::Failure, |_| ListenerDecision::SuppressError);
        let err = GraphMiddlewareError::IllegalState("closed".into());
        assert!(dispatcher.handle_failure(err).is_err());
    }
}

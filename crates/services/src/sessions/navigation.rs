//! Routes host navigation through the running session's exit protocol.
//!
//! A host owns one [`NavigationRegistry`]. The active session registers on
//! mount and deregisters on teardown; every route change the host observes
//! is offered to [`NavigationRegistry::attempt`] first. The registry holds a
//! weak reference, so a dropped session can never intercept anything.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use quiz_core::model::SessionInstanceId;

use super::exit::ExitMethod;
use super::machine::TestSession;

/// Host routing primitives.
///
/// Implementations must not call back into the session or registry; the
/// deferred exit navigation runs while the session is being finalized.
pub trait Navigator {
    fn current_location(&self) -> String;
    /// Rewrite the current location without adding a history entry.
    fn replace_location(&self, location: &str);
    fn navigate(&self, destination: &str);
}

/// A route change the host is about to perform, or has just observed for
/// browser-back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationAttempt {
    pub method: ExitMethod,
    pub destination: String,
}

impl NavigationAttempt {
    #[must_use]
    pub fn new(method: ExitMethod, destination: impl Into<String>) -> Self {
        Self {
            method,
            destination: destination.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    /// Nothing is listening; the host performs the navigation.
    Proceed,
    /// The session took over; the host must not navigate.
    Intercepted,
}

struct Registration {
    session_id: SessionInstanceId,
    session: Weak<RefCell<TestSession>>,
    /// Location at registration, restored after a browser-back.
    location: String,
}

pub struct NavigationRegistry {
    navigator: Rc<dyn Navigator>,
    slot: Option<Registration>,
}

impl NavigationRegistry {
    #[must_use]
    pub fn new(navigator: Rc<dyn Navigator>) -> Self {
        Self {
            navigator,
            slot: None,
        }
    }

    /// Install `session` as the interceptor, replacing any previous one.
    pub fn register(&mut self, session: &Rc<RefCell<TestSession>>) {
        let session_id = session.borrow().id();
        if let Some(previous) = self.slot.as_ref().filter(|r| r.session_id != session_id) {
            tracing::debug!(
                previous = %previous.session_id,
                session = %session_id,
                "replacing navigation interceptor"
            );
        }
        self.slot = Some(Registration {
            session_id,
            session: Rc::downgrade(session),
            location: self.navigator.current_location(),
        });
    }

    /// Remove the interceptor if it belongs to `session_id`.
    pub fn deregister(&mut self, session_id: SessionInstanceId) -> bool {
        if self.registered() == Some(session_id) {
            self.slot = None;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn registered(&self) -> Option<SessionInstanceId> {
        self.slot.as_ref().map(|r| r.session_id)
    }

    /// Offer a route change to the registered session.
    pub fn attempt(&mut self, attempt: NavigationAttempt) -> NavigationDecision {
        let Some(registration) = self.slot.as_ref() else {
            return NavigationDecision::Proceed;
        };
        let Some(session) = registration.session.upgrade() else {
            tracing::debug!(session = %registration.session_id, "dropping stale interceptor");
            self.slot = None;
            return NavigationDecision::Proceed;
        };
        // Hosts borrow the session for single steps only, so a held borrow
        // means its confirmed exit callback is navigating right now.
        let Ok(mut session) = session.try_borrow_mut() else {
            tracing::debug!(session = %registration.session_id, "session busy leaving; navigation proceeds");
            return NavigationDecision::Proceed;
        };
        if !session.should_intercept_navigation() {
            return NavigationDecision::Proceed;
        }

        if attempt.method == ExitMethod::BrowserBack {
            self.navigator.replace_location(&registration.location);
        }

        let navigator = Rc::clone(&self.navigator);
        let destination = attempt.destination;
        session.request_exit(
            attempt.method,
            Some(Box::new(move || navigator.navigate(&destination))),
        );
        NavigationDecision::Intercepted
    }

    /// Terminate `session` and remove it as interceptor.
    pub fn teardown(&mut self, session: &Rc<RefCell<TestSession>>) {
        let mut session = session.borrow_mut();
        session.terminate();
        self.deregister(session.id());
    }
}

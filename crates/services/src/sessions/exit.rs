use std::fmt;

use serde::Serialize;

/// How the user tried to leave a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitMethod {
    /// The in-session exit button.
    UiButton,
    /// Browser history back; already happened by the time it is observed.
    BrowserBack,
    /// Any other route change (sidebar, header links, ...).
    ExternalNavigation,
}

impl ExitMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UiButton => "ui-button",
            Self::BrowserBack => "browser-back",
            Self::ExternalNavigation => "external-navigation",
        }
    }
}

impl fmt::Display for ExitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deferred action run once an exit is confirmed.
pub type ExitCallback = Box<dyn FnOnce()>;

/// Exit waiting on the confirmation modal.
pub(crate) struct PendingExit {
    pub(crate) method: ExitMethod,
    pub(crate) callback: Option<ExitCallback>,
}

impl fmt::Debug for PendingExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingExit")
            .field("method", &self.method)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// What `confirm_exit` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// A deferred navigation is waiting out the exit animation; call
    /// `complete_exit` once it has played.
    Deferred,
    /// The default leave action ran and the session is terminated.
    Left,
}

/// Copy shown in the exit confirmation modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitModalCopy {
    pub title: &'static str,
    pub body: &'static str,
    pub confirm_label: &'static str,
    pub cancel_label: &'static str,
}

impl ExitModalCopy {
    #[must_use]
    pub fn for_method(method: ExitMethod) -> Self {
        let (title, body) = match method {
            ExitMethod::UiButton => (
                "Exit test?",
                "Your progress in this test will be lost.",
            ),
            ExitMethod::BrowserBack => (
                "Go back?",
                "Going back ends this test and your progress will be lost.",
            ),
            ExitMethod::ExternalNavigation => (
                "Leave this test?",
                "Leaving this page ends this test and your progress will be lost.",
            ),
        };
        Self {
            title,
            body,
            confirm_label: "Leave test",
            cancel_label: "Continue test",
        }
    }
}

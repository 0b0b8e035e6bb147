//! Action Executor
//!
//! Performs one user action against a freshly resolved element. When the
//! rendering engine rejects the native interaction (intercepted by an
//! overlay, element not interactive yet) the executor replays the action
//! through a script on the same handle.

use crate::driver::{scripts, ElementHandle, Session, SessionExt};
use crate::locator::Locator;
use crate::result::{ErrorKind, SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Script path used when the native interaction is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackStrategy {
    /// `element.click()` through the script channel
    ScriptClick,
    /// Assign `value` and fire input/change events
    ScriptSetValue,
    /// `scrollIntoView` through the script channel
    ScriptScroll,
    /// Synthesized `mouseover`
    ScriptHover,
    /// No fallback; a rejection is final
    None,
}

/// A single user action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// Click the element
    Click {
        /// Path taken when the native click is rejected
        fallback: FallbackStrategy,
    },
    /// Type text into the element
    Type {
        /// Text to enter
        text: String,
        /// Path taken when native typing is rejected
        fallback: FallbackStrategy,
    },
    /// Bring the element into view
    ScrollIntoView,
    /// Move the pointer over the element
    Hover {
        /// Path taken when the native hover is rejected
        fallback: FallbackStrategy,
    },
}

impl ActionKind {
    /// Click with script-click fallback
    #[must_use]
    pub const fn click() -> Self {
        Self::Click {
            fallback: FallbackStrategy::ScriptClick,
        }
    }

    /// Click with no fallback
    #[must_use]
    pub const fn click_native_only() -> Self {
        Self::Click {
            fallback: FallbackStrategy::None,
        }
    }

    /// Type with set-value fallback
    #[must_use]
    pub fn type_text(text: impl Into<String>) -> Self {
        Self::Type {
            text: text.into(),
            fallback: FallbackStrategy::ScriptSetValue,
        }
    }

    /// Hover with synthesized-event fallback
    #[must_use]
    pub const fn hover() -> Self {
        Self::Hover {
            fallback: FallbackStrategy::ScriptHover,
        }
    }

    /// Fallback configured for this action
    #[must_use]
    pub const fn fallback(&self) -> FallbackStrategy {
        match self {
            Self::Click { fallback } | Self::Type { fallback, .. } | Self::Hover { fallback } => {
                *fallback
            }
            Self::ScrollIntoView => FallbackStrategy::None,
        }
    }

    /// Short name for logs and errors
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Click { .. } => "click",
            Self::Type { .. } => "type",
            Self::ScrollIntoView => "scroll",
            Self::Hover { .. } => "hover",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    /// The page received the action
    pub succeeded: bool,
    /// The script fallback carried it
    pub used_fallback: bool,
    /// Classification of the failure, if any
    pub error: Option<ErrorKind>,
}

impl ActionResult {
    /// Native path succeeded
    #[must_use]
    pub const fn native() -> Self {
        Self {
            succeeded: true,
            used_fallback: false,
            error: None,
        }
    }

    /// Fallback path succeeded
    #[must_use]
    pub const fn fallback() -> Self {
        Self {
            succeeded: true,
            used_fallback: true,
            error: None,
        }
    }

    /// Action failed
    #[must_use]
    pub const fn failed(kind: ErrorKind) -> Self {
        Self {
            succeeded: false,
            used_fallback: false,
            error: Some(kind),
        }
    }
}

/// Pre-interaction behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionOptions {
    /// Scroll the element to the viewport center first
    pub scroll_first: bool,
    /// Hide `.overlay, .popup` before interacting
    pub dismiss_overlays: bool,
}

impl Default for ActionOptions {
    fn default() -> Self {
        Self {
            scroll_first: true,
            dismiss_overlays: false,
        }
    }
}

/// Executes actions over a session
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionExecutor {
    options: ActionOptions,
}

impl ActionExecutor {
    /// Executor with default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor with custom options
    #[must_use]
    pub const fn with_options(options: ActionOptions) -> Self {
        Self { options }
    }

    /// Executor that hides overlays before every interaction
    #[must_use]
    pub const fn dismissing_overlays(mut self) -> Self {
        self.options.dismiss_overlays = true;
        self
    }

    /// Resolve `locator` and perform `action` on the first match.
    ///
    /// # Errors
    ///
    /// `ElementNotFound` when nothing matches, `ActionBlocked` when the native
    /// and fallback paths both fail, `StaleReference` when the element detaches
    /// mid-action (for the retry guard to handle).
    pub fn perform<S: Session + ?Sized>(
        &self,
        session: &S,
        locator: &Locator,
        action: &ActionKind,
    ) -> SyncResult<ActionResult> {
        let element = session.resolve(locator)?;
        self.perform_on(session, &element, action)
    }

    /// Perform `action` on an already resolved element
    pub fn perform_on<S: Session + ?Sized>(
        &self,
        session: &S,
        element: &ElementHandle,
        action: &ActionKind,
    ) -> SyncResult<ActionResult> {
        if self.options.dismiss_overlays {
            if let Err(e) = session.execute_script(scripts::HIDE_OVERLAYS, &[], None) {
                debug!(error = %e, "no overlay removed");
            }
        }
        if self.options.scroll_first && !matches!(action, ActionKind::ScrollIntoView) {
            let _ = session.execute_script(scripts::SCROLL_INTO_VIEW, &[element], None)?;
        }

        let native = match action {
            ActionKind::Click { .. } => session.click(element),
            ActionKind::Type { text, .. } => session.send_keys(element, text),
            ActionKind::Hover { .. } => session.hover(element),
            ActionKind::ScrollIntoView => session
                .execute_script(scripts::SCROLL_INTO_VIEW, &[element], None)
                .map(|_| ()),
        };

        match native {
            Ok(()) => {
                debug!(action = %action, element = %element, "native action succeeded");
                Ok(ActionResult::native())
            }
            Err(e) if e.is_rejected_interaction() => self.fall_back(session, element, action, &e),
            Err(e) => Err(e),
        }
    }

    fn fall_back<S: Session + ?Sized>(
        &self,
        session: &S,
        element: &ElementHandle,
        action: &ActionKind,
        native: &SyncError,
    ) -> SyncResult<ActionResult> {
        let blocked = |fallback: String| SyncError::ActionBlocked {
            locator: element.origin.clone(),
            action: action.name().to_string(),
            native: native.to_string(),
            fallback,
        };

        let (script, extra) = match (action.fallback(), action) {
            (FallbackStrategy::None, _) => return Err(blocked("no fallback configured".into())),
            (FallbackStrategy::ScriptClick, _) => (scripts::CLICK, None),
            (FallbackStrategy::ScriptSetValue, ActionKind::Type { text, .. }) => {
                (scripts::SET_VALUE, Some(text.as_str()))
            }
            (FallbackStrategy::ScriptSetValue, _) => {
                return Err(blocked("set-value fallback needs text".into()))
            }
            (FallbackStrategy::ScriptScroll, _) => (scripts::SCROLL_INTO_VIEW, None),
            (FallbackStrategy::ScriptHover, _) => (scripts::HOVER, None),
        };

        warn!(action = %action, element = %element, cause = %native, "native action rejected, using script fallback");
        match session.execute_script(script, &[element], extra) {
            Ok(_) => Ok(ActionResult::fallback()),
            Err(e) if e.is_stale() => Err(e),
            Err(e) => Err(blocked(e.to_string())),
        }
    }

    /// Like [`ActionExecutor::perform`], but folds any failure into the result
    pub fn try_perform<S: Session + ?Sized>(
        &self,
        session: &S,
        locator: &Locator,
        action: &ActionKind,
    ) -> ActionResult {
        self.perform(session, locator, action)
            .unwrap_or_else(|e| ActionResult::failed(e.kind()))
    }
}

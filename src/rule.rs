use std::{fmt, rc::Rc};

use crate::{
    error::Result,
    path::{IntoPaths, PathDescriptor},
    registry::Action,
};

/// When a run-on-attach action runs relative to the others.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum AttachPhase {
    #[default]
    Initial,
    /// After every `Initial` action, right before live propagation starts.
    Settle,
}

/// A rule: run `action` whenever one of its trigger paths changes.
///
/// ```rust,ignore
/// binder.add_rule(
///     Rule::new(|ctx: &Rc<Order>| ctx.recalculate())
///         .on(["lines[].price", "discount"])
///         .key("total"),
/// )?;
/// ```
pub struct Rule<C> {
    pub(crate) action: Action<C>,
    pub(crate) key: Option<Box<str>>,
    pub(crate) run_on_attach: bool,
    pub(crate) phase: AttachPhase,
    pub(crate) can_override: bool,
    pub(crate) triggers: Result<Vec<PathDescriptor>>,
}

impl<C: 'static> Rule<C> {
    pub fn new(action: impl Fn(&Rc<C>) + 'static) -> Self {
        Self::from_action(Rc::new(action))
    }

    pub fn from_action(action: Action<C>) -> Self {
        Self {
            action,
            key: None,
            run_on_attach: false,
            phase: AttachPhase::Initial,
            can_override: false,
            triggers: Ok(Vec::new()),
        }
    }

    /// Adds trigger paths. Malformed paths surface from `add_rule`.
    pub fn on(mut self, paths: impl IntoPaths) -> Self {
        if let Ok(triggers) = &mut self.triggers {
            match paths.into_paths() {
                Ok(paths) => triggers.extend(paths),
                Err(err) => self.triggers = Err(err),
            }
        }
        self
    }

    /// An empty key is the same as no key.
    pub fn key(mut self, key: impl Into<Box<str>>) -> Self {
        let key = key.into();
        self.key = (!key.is_empty()).then_some(key);
        self
    }

    pub fn run_on_attach(mut self, run_on_attach: bool) -> Self {
        self.run_on_attach = run_on_attach;
        self
    }

    pub fn can_override(mut self, can_override: bool) -> Self {
        self.can_override = can_override;
        self
    }

    pub(crate) fn settle_on_attach(mut self) -> Self {
        self.run_on_attach = true;
        self.phase = AttachPhase::Settle;
        self
    }

    pub(crate) fn with_triggers(mut self, triggers: Result<Vec<PathDescriptor>>) -> Self {
        self.triggers = triggers;
        self
    }
}

impl<C> fmt::Debug for Rule<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("key", &self.key)
            .field("run_on_attach", &self.run_on_attach)
            .field("phase", &self.phase)
            .field("can_override", &self.can_override)
            .field("triggers", &self.triggers)
            .finish()
    }
}

use std::rc::Rc;

use crate::{
    binder::PropertyBinder,
    error::Result,
    path::{IntoPaths, PathDescriptor},
    registry::ActionId,
    rule::Rule,
};

/// Builder returned by [`PropertyBinder::bind`]: keeps a target property
/// equal to a source expression.
#[must_use = "a property binding does nothing until `to` is called"]
pub struct PropertyRuleBuilder<'a, C: 'static, T: 'static> {
    binder: &'a mut PropertyBinder<C>,
    source: Rc<dyn Fn(&C) -> T>,
    paths: Result<Vec<PathDescriptor>>,
    key: Option<Box<str>>,
    run_on_attach: bool,
    can_override: bool,
}

impl<'a, C: 'static, T: 'static> PropertyRuleBuilder<'a, C, T> {
    pub(crate) fn new(
        binder: &'a mut PropertyBinder<C>,
        paths: impl IntoPaths,
        source: Rc<dyn Fn(&C) -> T>,
    ) -> Self {
        Self {
            binder,
            source,
            paths: paths.into_paths(),
            key: None,
            run_on_attach: true,
            can_override: true,
        }
    }

    /// Registers under `key` instead of the target key.
    pub fn override_key(mut self, key: impl Into<Box<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn do_not_run_on_attach(mut self) -> Self {
        self.run_on_attach = false;
        self
    }

    pub fn do_not_override(mut self) -> Self {
        self.can_override = false;
        self
    }

    pub fn to(self, target: &str, set: impl Fn(&C, T) + 'static) -> Result<ActionId> {
        let Self {
            binder,
            source,
            paths,
            key,
            run_on_attach,
            can_override,
        } = self;
        let rule = Rule::new(move |ctx: &Rc<C>| set(&**ctx, source(&**ctx)))
            .with_triggers(paths)
            .key(key.unwrap_or_else(|| target.into()))
            .run_on_attach(run_on_attach)
            .can_override(can_override);
        binder.add_rule(rule)
    }
}

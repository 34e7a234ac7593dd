mod common;

use std::rc::Rc;

use common::{Counter, Stub};
use propbind::{CheckMode, Command, Error, PropertyBinder, Rule};

fn count_changes(command: &Command) -> Counter {
    let calls = Counter::new();
    command.on_can_execute_changed({
        let calls = calls.clone();
        move || calls.bump()
    });
    calls
}

#[test]
fn command_is_assigned_and_tracks_its_condition() {
    let mut binder = PropertyBinder::<Stub>::new();
    binder
        .bind_command(
            |ctx: &Stub| ctx.set_int(ctx.int() + 1),
            |ctx: &Stub| ctx.flag() && ctx.string().is_some(),
        )
        .when(["flag", "string"])
        .to("command", Stub::command, Stub::set_command)
        .unwrap();

    let stub = Stub::new();
    let _attached = binder.attach(&stub);
    let command = stub.command().expect("command assigned on attach");
    assert!(!command.can_execute(&()));

    let changes = count_changes(&command);
    stub.set_flag(true);
    assert_eq!(changes.get(), 0);
    assert!(!command.can_execute(&()));

    stub.set_string(Some("a"));
    assert_eq!(changes.get(), 1);
    assert!(command.can_execute(&()));
    assert!(command.is_enabled());

    assert_eq!(stub.int(), 0);
    command.execute(&()).unwrap();
    assert_eq!(stub.int(), 1);
}

#[test]
fn command_with_argument() {
    let mut binder = PropertyBinder::<Stub>::new();
    binder
        .bind_command_with_arg(
            |ctx: &Stub, arg: &i32| ctx.set_int(ctx.int() + arg),
            |ctx: &Stub, arg: &i32| ctx.flag() && *arg > 0,
        )
        .when("flag")
        .to("arg_command", Stub::arg_command, Stub::set_arg_command)
        .unwrap();

    let stub = Stub::new();
    let _attached = binder.attach(&stub);
    let command = stub.arg_command().unwrap();
    assert!(!command.can_execute(&0));
    assert!(!command.can_execute(&2));

    let changes = Counter::new();
    command.on_can_execute_changed({
        let changes = changes.clone();
        move || changes.bump()
    });
    stub.set_flag(true);
    assert_eq!(changes.get(), 1);
    assert!(!command.can_execute(&0));
    assert!(command.can_execute(&2));

    // Disabled for this argument, so nothing runs.
    command.execute(&0).unwrap();
    assert_eq!(stub.int(), 0);
    command.execute(&2).unwrap();
    assert_eq!(stub.int(), 2);
}

#[test]
fn enabled_state_is_correct_right_after_attach() {
    for enabled in [false, true] {
        let mut binder = PropertyBinder::<Stub>::new();
        binder
            .bind_command(|_: &Stub| {}, |ctx: &Stub| ctx.flag())
            .when("flag")
            .to("command", Stub::command, Stub::set_command)
            .unwrap();

        let stub = Stub::new();
        stub.set_flag(enabled);
        let _attached = binder.attach(&stub);
        let command = stub.command().unwrap();
        assert_eq!(command.can_execute(&()), enabled);
        assert_eq!(command.is_enabled(), enabled);
    }
}

#[test]
fn rebinding_a_command_target_overrides_it() {
    let mut binder = PropertyBinder::<Stub>::new();
    binder
        .bind_command(|ctx: &Stub| ctx.set_int(ctx.int() + 1), |ctx: &Stub| ctx.flag())
        .when("flag")
        .to("command", Stub::command, Stub::set_command)
        .unwrap();
    binder
        .bind_command(|ctx: &Stub| ctx.set_int(ctx.int() + 10), |ctx: &Stub| ctx.flag())
        .when("flag")
        .to("command", Stub::command, Stub::set_command)
        .unwrap();
    assert_eq!(binder.registry().keyed("command").len(), 3);

    let stub = Stub::new();
    let _attached = binder.attach(&stub);
    let command = stub.command().unwrap();
    assert!(!command.can_execute(&()));

    stub.set_flag(true);
    assert!(command.can_execute(&()));
    command.execute(&()).unwrap();
    assert_eq!(stub.int(), 10);
}

#[test]
fn unbound_commands_are_not_assigned() {
    let mut binder = PropertyBinder::<Stub>::new();
    binder
        .bind_command(|ctx: &Stub| ctx.set_int(ctx.int() + 1), |ctx: &Stub| ctx.flag())
        .when("flag")
        .to("command", Stub::command, Stub::set_command)
        .unwrap();
    assert!(binder.unbind("command"));
    assert!(!binder.graph().has_actions());

    let stub = Stub::new();
    let _attached = binder.attach(&stub);
    assert!(stub.command().is_none());
}

#[test]
fn commands_can_be_unbound_by_custom_key() {
    let mut binder = PropertyBinder::<Stub>::new();
    binder
        .bind_command(|ctx: &Stub| ctx.set_int(ctx.int() + 1), |ctx: &Stub| ctx.flag())
        .when("flag")
        .override_key("testCommand")
        .to("command", Stub::command, Stub::set_command)
        .unwrap();
    assert!(!binder.unbind("command"));
    assert!(binder.unbind("testCommand"));

    let stub = Stub::new();
    let _attached = binder.attach(&stub);
    assert!(stub.command().is_none());
}

#[test]
fn condition_changed_by_earlier_attach_actions() {
    let mut binder = PropertyBinder::<Stub>::new();
    binder
        .bind("int", |ctx: &Stub| ctx.int() >= 0)
        .to("flag", Stub::set_flag)
        .unwrap();
    binder
        .bind_command(|_: &Stub| {}, |ctx: &Stub| ctx.flag())
        .when("flag")
        .to("command", Stub::command, Stub::set_command)
        .unwrap();

    let stub = Stub::new();
    let _attached = binder.attach(&stub);
    let command = stub.command().unwrap();
    let changes = count_changes(&command);
    assert!(command.can_execute(&()));
    stub.set_int(-1);
    assert!(!command.can_execute(&()));
    assert_eq!(changes.get(), 1);
}

#[test]
fn condition_changed_by_later_attach_actions() {
    let mut binder = PropertyBinder::<Stub>::new();
    binder
        .bind_command(|_: &Stub| {}, |ctx: &Stub| ctx.flag())
        .when("flag")
        .to("command", Stub::command, Stub::set_command)
        .unwrap();
    binder
        .bind("int", |ctx: &Stub| ctx.int() >= 0)
        .to("flag", Stub::set_flag)
        .unwrap();

    let stub = Stub::new();
    let _attached = binder.attach(&stub);
    let command = stub.command().unwrap();
    assert!(command.is_enabled());

    let changes = count_changes(&command);
    stub.set_int(-1);
    assert!(!command.can_execute(&()));
    assert_eq!(changes.get(), 1);
}

fn external_condition(stub: &Stub) -> bool {
    stub.flag()
}

#[test]
fn custom_dependencies_trigger_reevaluation() {
    let mut binder = PropertyBinder::<Stub>::new();
    binder
        .bind_command(|_: &Stub| {}, external_condition)
        .with_dependency("flag")
        .to("command", Stub::command, Stub::set_command)
        .unwrap();

    let stub = Stub::new();
    let _attached = binder.attach(&stub);
    let command = stub.command().unwrap();
    let changes = count_changes(&command);
    assert!(!command.can_execute(&()));

    stub.set_flag(true);
    assert_eq!(changes.get(), 1);
    assert!(command.can_execute(&()));
}

fn mode_binder(mode: CheckMode, executed: &Counter) -> PropertyBinder<Stub> {
    let mut binder = PropertyBinder::<Stub>::new();
    binder
        .bind_command(
            {
                let executed = executed.clone();
                move |_: &Stub| executed.bump()
            },
            |_: &Stub| false,
        )
        .with_check_mode(mode)
        .to("command", Stub::command, Stub::set_command)
        .unwrap();
    binder
}

#[test]
fn do_not_check_always_executes() {
    let executed = Counter::new();
    let binder = mode_binder(CheckMode::DoNotCheck, &executed);
    let stub = Stub::new();
    let _attached = binder.attach(&stub);

    stub.command().unwrap().execute(&()).unwrap();
    assert_eq!(executed.get(), 1);
}

#[test]
fn do_not_execute_never_executes() {
    let executed = Counter::new();
    let binder = mode_binder(CheckMode::DoNotExecute, &executed);
    let stub = Stub::new();
    let _attached = binder.attach(&stub);

    let command = stub.command().unwrap();
    assert_eq!(command.check_mode(), CheckMode::DoNotExecute);
    command.execute(&()).unwrap();
    assert_eq!(executed.get(), 0);
}

#[test]
fn throw_exception_fails_when_disabled() {
    let executed = Counter::new();
    let binder = mode_binder(CheckMode::ThrowException, &executed);
    let stub = Stub::new();
    let _attached = binder.attach(&stub);

    let result = stub.command().unwrap().execute(&());
    assert!(matches!(result, Err(Error::InvalidOperation(_))));
    assert_eq!(executed.get(), 0);
    assert_eq!(stub.int(), 0);
}

#[test]
fn throw_exception_executes_when_enabled() {
    let mut binder = PropertyBinder::<Stub>::new();
    binder
        .bind_command(|ctx: &Stub| ctx.set_int(7), |_: &Stub| true)
        .with_check_mode(CheckMode::ThrowException)
        .to("command", Stub::command, Stub::set_command)
        .unwrap();
    let stub = Stub::new();
    let _attached = binder.attach(&stub);

    stub.command().unwrap().execute(&()).unwrap();
    assert_eq!(stub.int(), 7);
}

#[test]
fn unattached_commands_are_inert() {
    let command = Command::<()>::default();
    assert!(!command.can_execute(&()));
    assert!(!command.is_enabled());
    assert!(command.execute(&()).is_ok());
}

#[test]
fn commands_outliving_their_context_are_disabled() {
    let executed = Counter::new();
    let binder = mode_binder(CheckMode::DoNotCheck, &executed);
    let stub = Stub::new();
    let attached = binder.attach(&stub);
    let command = stub.command().unwrap();

    drop(attached);
    drop(stub);
    assert!(!command.can_execute(&()));
    command.execute(&()).unwrap();
    assert_eq!(executed.get(), 0);
}

#[test]
fn rules_can_watch_command_state() {
    let changes = Counter::new();
    let mut binder = PropertyBinder::<Stub>::new();
    binder
        .bind_command(|_: &Stub| {}, |ctx: &Stub| ctx.flag())
        .when("flag")
        .to("command", Stub::command, Stub::set_command)
        .unwrap();
    binder
        .add_rule(
            Rule::new({
                let changes = changes.clone();
                move |_: &Rc<Stub>| changes.bump()
            })
            .on("command.can_execute"),
        )
        .unwrap();

    let stub = Stub::new();
    let _attached = binder.attach(&stub);
    stub.set_flag(true);
    stub.set_int(3);
    stub.set_flag(false);
    assert_eq!(changes.get(), 2);
}

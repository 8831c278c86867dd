//! Row algebra from the outside: membership at depth, weakening as an
//! identity, and handler order independence on wider rows.

use effrow::effects::error::{run_error, throw, ErrorEffect};
use effrow::effects::reader::{ask, run_reader, ReaderEffect};
use effrow::effects::state::{get, put, run_state, StateEffect};
use effrow::effects::writer::{run_writer, tell, WriterEffect};
use effrow::prelude::*;
use rstest::rstest;

type Triple = Fx![ReaderEffect<i32>, WriterEffect<String>, StateEffect<i32>];

fn triple_program() -> Eff<Triple, i32> {
    ask()
        .flat_map(|environment: i32| {
            tell(format!("env={environment}")).then(get().map(move |x: i32| x + environment))
        })
        .flat_map(|total: i32| put(total).then(Eff::pure(total)))
}

#[rstest]
fn three_handlers_discharge_a_three_effect_row() {
    let program = triple_program();
    let ((result, state), log) = run(run_reader(run_writer(run_state(program, 2)), 40));
    assert_eq!(result, 42);
    assert_eq!(state, 42);
    assert_eq!(log, vec!["env=40".to_string()]);
}

#[rstest]
fn handler_order_does_not_change_the_outcome() {
    // Reader first.
    let ((result, log), state) = run(run_state(run_writer(run_reader(triple_program(), 40)), 2));
    assert_eq!((result, state), (42, 42));
    assert_eq!(log, vec!["env=40".to_string()]);

    // Writer first.
    let ((result, state), log) = run(run_writer(run_state(run_reader(triple_program(), 40), 2)));
    assert_eq!((result, state), (42, 42));
    assert_eq!(log, vec!["env=40".to_string()]);
}

#[rstest]
fn weakening_a_pure_program_is_the_identity() {
    type Small = Fx![WriterEffect<String>];
    type Big = Fx![WriterEffect<String>, StateEffect<i32>, ErrorEffect<String>];

    let lifted: Eff<Big, i32> = eff_into(Eff::<Small, i32>::pure(11));
    assert_eq!(run_pure(lifted), Some(11));
}

#[rstest]
fn weakened_programs_interpret_exactly_like_the_originals() {
    type Small = Fx![WriterEffect<String>, StateEffect<i32>];
    type Big = Fx![WriterEffect<String>, StateEffect<i32>, ErrorEffect<String>];

    fn small_program() -> Eff<Small, i32> {
        tell("step".to_string()).then(get()).flat_map(|x: i32| put(x * 2).then(Eff::pure(x)))
    }

    let ((direct, direct_log), direct_state) =
        run(run_state(run_writer(small_program()), 4));

    let lifted: Eff<Big, i32> = eff_into(small_program());
    let outcome: Result<((i32, Vec<String>), i32), String> =
        run(run_error(run_state(run_writer(lifted), 4)));
    let ((lifted_result, lifted_log), lifted_state) =
        outcome.expect("the lifted program throws nothing");

    assert_eq!(lifted_result, direct);
    assert_eq!(lifted_log, direct_log);
    assert_eq!(lifted_state, direct_state);
}

#[rstest]
fn an_error_deep_in_the_row_still_aborts() {
    type Big = Fx![WriterEffect<String>, StateEffect<i32>, ErrorEffect<String>];

    let program: Eff<Big, i32> = tell("before".to_string())
        .then::<()>(throw("stop".to_string()))
        .then(tell("after".to_string()))
        .then(Eff::pure(1));

    let outcome = run(run_error(run_state(run_writer(program), 0)));
    assert_eq!(outcome, Err("stop".to_string()));
}

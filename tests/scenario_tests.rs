//! End-to-end scenarios combining program construction, row algebra,
//! and the effect modules.

use effrow::effects::list::{from_vec, run_list, ListEffect};
use effrow::effects::state::{get, put, run_state, StateEffect};
use effrow::effects::writer::{run_writer, tell, WriterEffect};
use effrow::prelude::*;
use rstest::rstest;

#[rstest]
fn a_pure_program_runs_to_its_value() {
    assert_eq!(run(Eff::<NoFx, i32>::pure(3)), 3);
}

#[rstest]
fn nested_list_sends_multiply_as_a_cartesian_product() {
    type App = Fx![ListEffect];

    let program: Eff<App, i32> = from_vec(vec![1, 2, 3])
        .flat_map(|x: i32| from_vec(vec![10, 20]).map(move |y: i32| x * y));

    assert_eq!(run(run_list(program)), vec![10, 20, 20, 40, 30, 60]);
}

#[rstest]
fn sequenced_tells_accumulate_around_the_result() {
    type App = Fx![WriterEffect<String>];

    let program: Eff<App, i32> = tell("a".to_string())
        .then(tell("b".to_string()))
        .then(Eff::pure(7));

    let (result, log) = run(run_writer(program));
    assert_eq!(result, 7);
    assert_eq!(log, vec!["a".to_string(), "b".to_string()]);
}

#[rstest]
fn applicative_list_functions_keep_applicative_ordering() {
    type App = Fx![ListEffect];

    let functions: Eff<App, fn(i32) -> i32> =
        from_vec(vec![(|x| x + 1) as fn(i32) -> i32, |x| x * 2]);
    let operands: Eff<App, i32> = from_vec(vec![10, 20]);

    assert_eq!(run(run_list(functions.ap(operands))), vec![11, 21, 20, 40]);
}

#[rstest]
fn get_put_then_get_threads_the_state() {
    type App = Fx![StateEffect<i32>];

    let program: Eff<App, i32> = get().flat_map(|x: i32| put(x + 1)).then(get());

    assert_eq!(run(run_state(program, 41)), (42, 42));
}

#[rstest]
fn a_writer_program_weakens_into_a_wider_row_and_runs_first() {
    type Small = Fx![WriterEffect<String>];
    type Large = Fx![WriterEffect<String>, StateEffect<i32>];

    let functions: Eff<Small, fn(i32) -> i32> = Eff::pure(|x| x + 1);
    let operand: Eff<Small, i32> = tell("x".to_string()).then(Eff::pure(1));
    let small = functions.ap(operand);

    let large: Eff<Large, i32> = eff_into(small);
    let ((result, log), state) = run(run_state(run_writer(large), 99));

    assert_eq!(result, 2);
    assert_eq!(log, vec!["x".to_string()]);
    // The state effect was never invoked.
    assert_eq!(state, 99);
}

#[rstest]
fn independent_effects_from_different_rows_interpret_in_either_order() {
    type App = Fx![WriterEffect<String>, StateEffect<i32>];

    fn program() -> Eff<App, i32> {
        tell("before".to_string())
            .then(get())
            .flat_map(|x: i32| put(x * 2))
            .then(tell("after".to_string()))
            .then(get())
    }

    // Writer first, then state.
    let ((result, log), state) = run(run_state(run_writer(program()), 21));
    assert_eq!((result, state), (42, 42));
    assert_eq!(log, vec!["before".to_string(), "after".to_string()]);

    // State first, then writer.
    let ((result, state), log) = run(run_writer(run_state(program(), 21)));
    assert_eq!((result, state), (42, 42));
    assert_eq!(log, vec!["before".to_string(), "after".to_string()]);
}

#[rstest]
fn batches_preserve_positions_across_partial_interpretation() {
    type App = Fx![WriterEffect<String>, StateEffect<i32>];

    // A batch interleaving writer and state effects: the tuple must
    // come back in construction order whichever handler runs first.
    let program: Eff<App, ((), i32, ())> = tell("w1".to_string())
        .product(get())
        .product(tell("w2".to_string()))
        .map(|(((), x), ())| ((), x, ()));

    let ((result, log), state) = run(run_state(run_writer(program), 5));
    assert_eq!(result, ((), 5, ()));
    assert_eq!(log, vec!["w1".to_string(), "w2".to_string()]);
    assert_eq!(state, 5);
}

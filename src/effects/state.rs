//! State effect: read and replace a threaded value.
//!
//! # Operations
//!
//! - [`get`]: retrieves the current state
//! - [`put`]: replaces the current state
//! - [`modify`]: applies a function to the state
//! - [`gets`]: retrieves a projection of the state
//!
//! # Examples
//!
//! ```rust
//! use effrow::prelude::*;
//! use effrow::effects::state::{get, put, run_state, StateEffect};
//!
//! type App = Fx![StateEffect<i32>];
//!
//! let program: Eff<App, i32> = get().flat_map(|x: i32| put(x + 1)).then(get());
//! assert_eq!(run(run_state(program, 41)), (42, 42));
//! ```

use std::marker::PhantomData;

use crate::eff::{send, Eff};
use crate::effect::{value, Effect, Request, Value};
use crate::handler::{interpret_state, StateRecurse};
use crate::member::Member;
use crate::row::Row;

mod operations {
    use crate::effect::OperationTag;

    pub const GET: OperationTag = OperationTag::new(10);
    pub const PUT: OperationTag = OperationTag::new(11);
}

/// State effect marker: the capability to read and replace an `S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateEffect<S>(PhantomData<S>);

impl<S: 'static> Effect for StateEffect<S> {
    const NAME: &'static str = "State";
}

/// Retrieves the current state.
#[must_use]
pub fn get<S, R, I>() -> Eff<R, S>
where
    S: Clone + 'static,
    R: Member<StateEffect<S>, I>,
{
    send::<StateEffect<S>, R, I, S>(Request::new(operations::GET, ()))
}

/// Replaces the current state.
#[must_use]
pub fn put<S, R, I>(state: S) -> Eff<R, ()>
where
    S: Clone + 'static,
    R: Member<StateEffect<S>, I>,
{
    send::<StateEffect<S>, R, I, ()>(Request::new(operations::PUT, state))
}

/// Applies a function to the state.
#[must_use]
pub fn modify<S, R, I>(modifier: impl Fn(S) -> S + 'static) -> Eff<R, ()>
where
    S: Clone + 'static,
    R: Member<StateEffect<S>, I>,
    I: 'static,
{
    get().flat_map(move |state| put(modifier(state)))
}

/// Retrieves a projection of the state.
#[must_use]
pub fn gets<S, T, R, I>(projection: impl Fn(&S) -> T + 'static) -> Eff<R, T>
where
    S: Clone + 'static,
    T: 'static,
    R: Member<StateEffect<S>, I>,
{
    get().map(move |state| projection(&state))
}

#[derive(Clone)]
struct StateInterpreter<S> {
    initial: S,
}

impl<S, A> StateRecurse<StateEffect<S>, A, (A, S)> for StateInterpreter<S>
where
    S: Clone + 'static,
    A: 'static,
{
    type State = S;

    fn init(&mut self) -> S {
        self.initial.clone()
    }

    fn apply(&mut self, request: Request<StateEffect<S>>, state: S) -> (Value, S) {
        match request.operation() {
            operations::GET => (value(state.clone()), state),
            operations::PUT => (value(()), request.arguments::<S>()),
            unknown => panic!("unknown State operation: {unknown:?}"),
        }
    }

    fn finalize(&mut self, result: A, state: S) -> (A, S) {
        (result, state)
    }
}

/// Runs the state effect, returning the result and the final state.
///
/// Applicative batches thread the state through their requests in
/// presentation order.
#[must_use]
pub fn run_state<S, I, R, A>(effect: Eff<R, A>, initial: S) -> Eff<R::Out, (A, S)>
where
    S: Clone + 'static,
    I: 'static,
    R: Member<StateEffect<S>, I>,
    R::Out: Row,
    A: Clone + 'static,
{
    interpret_state::<StateEffect<S>, I, R, R::Out, A, (A, S), _>(
        effect,
        StateInterpreter { initial },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Fx1;
    use crate::runner::run;
    use rstest::rstest;

    type App = Fx1<StateEffect<i32>>;

    #[rstest]
    fn get_reads_the_initial_state() {
        let program: Eff<App, i32> = get();
        assert_eq!(run(run_state(program, 42)), (42, 42));
    }

    #[rstest]
    fn put_replaces_the_state() {
        let program: Eff<App, ()> = put(100);
        assert_eq!(run(run_state(program, 0)), ((), 100));
    }

    #[rstest]
    fn modify_applies_the_function() {
        let program: Eff<App, i32> = modify(|x: i32| x * 2).then(get());
        assert_eq!(run(run_state(program, 21)), (42, 42));
    }

    #[rstest]
    fn gets_projects_the_state() {
        type Strings = Fx1<StateEffect<Vec<String>>>;
        let program: Eff<Strings, usize> = gets(|items: &Vec<String>| items.len());
        let (length, _) = run(run_state(program, vec!["a".to_string(), "b".to_string()]));
        assert_eq!(length, 2);
    }

    #[rstest]
    fn state_threads_left_to_right_through_batches() {
        let program: Eff<App, (i32, ())> = get().product(put(9));
        let ((seen, ()), final_state) = run(run_state(program, 3));
        assert_eq!(seen, 3);
        assert_eq!(final_state, 9);
    }

    #[rstest]
    fn deep_state_chains_are_stack_safe() {
        let mut program: Eff<App, ()> = Eff::pure(());
        for _ in 0..50_000 {
            program = program.then(modify(|x: i32| x + 1));
        }
        let ((), final_state) = run(run_state(program, 0));
        assert_eq!(final_state, 50_000);
    }
}

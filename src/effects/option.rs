//! Option effect: computations that may produce nothing.
//!
//! [`none`] aborts the rest of the program; [`run_option`] materializes
//! the outcome as an `Option`. A single-effect program can also be
//! peeled straight into `Option` with [`detach`](crate::runner::detach).

use std::ops::ControlFlow;

use crate::eff::{send, Eff};
use crate::effect::{Effect, Request, Value};
use crate::handler::{interpret, Batched, Recurse};
use crate::member::Member;
use crate::row::Row;
use crate::runner::MonadEffect;

mod operations {
    use crate::effect::OperationTag;

    pub const NONE: OperationTag = OperationTag::new(50);
}

/// Option effect marker: the capability to abort with no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptionEffect;

impl Effect for OptionEffect {
    const NAME: &'static str = "Option";
}

/// Aborts the program with no value.
#[must_use]
pub fn none<A, R, I>() -> Eff<R, A>
where
    A: 'static,
    R: Member<OptionEffect, I>,
{
    send::<OptionEffect, R, I, A>(Request::new(operations::NONE, ()))
}

#[derive(Clone)]
struct OptionRecurse;

impl<U, A> Recurse<OptionEffect, U, Option<A>> for OptionRecurse
where
    U: Row,
    A: 'static,
{
    fn apply(&mut self, request: Request<OptionEffect>) -> Result<Value, Eff<U, Option<A>>> {
        match request.operation() {
            operations::NONE => Err(Eff::pure(None)),
            unknown => panic!("unknown Option operation: {unknown:?}"),
        }
    }

    fn applicative(&mut self, requests: Vec<Request<OptionEffect>>) -> Batched<OptionEffect> {
        // Any request in the batch aborts; compress to one and let the
        // monadic path short-circuit.
        let mut requests = requests;
        Batched::Compressed(requests.swap_remove(0))
    }
}

/// Runs the option effect, returning `Some` for finished programs and
/// `None` when the program aborted.
#[must_use]
pub fn run_option<I, R, A>(effect: Eff<R, A>) -> Eff<R::Out, Option<A>>
where
    I: 'static,
    R: Member<OptionEffect, I>,
    R::Out: Row,
    A: Clone + 'static,
{
    interpret::<OptionEffect, I, R, R::Out, A, Option<A>, _, _>(effect, Some, OptionRecurse)
}

impl MonadEffect for OptionEffect {
    type Target<T: 'static> = Option<T>;

    fn pure<T: 'static>(value: T) -> Option<T> {
        Some(value)
    }

    fn map<T: 'static, O: 'static>(target: Option<T>, function: impl FnOnce(T) -> O) -> Option<O> {
        target.map(function)
    }

    fn embed(request: Request<Self>) -> Option<Value> {
        match request.operation() {
            operations::NONE => None,
            unknown => panic!("unknown Option operation: {unknown:?}"),
        }
    }

    fn tail_rec<S: 'static, T: 'static>(
        initial: S,
        mut step: impl FnMut(S) -> Option<ControlFlow<T, S>>,
    ) -> Option<T> {
        let mut state = initial;
        loop {
            match step(state)? {
                ControlFlow::Continue(next) => state = next,
                ControlFlow::Break(finished) => return Some(finished),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Fx1;
    use crate::runner::{detach, run};
    use rstest::rstest;

    type App = Fx1<OptionEffect>;

    #[rstest]
    fn a_finished_program_is_some() {
        let program: Eff<App, i32> = Eff::pure(42);
        assert_eq!(run(run_option(program)), Some(42));
    }

    #[rstest]
    fn none_aborts_the_rest() {
        let program: Eff<App, i32> = none::<i32, App, _>().map(|x: i32| x + 1);
        assert_eq!(run(run_option(program)), None);
    }

    #[rstest]
    fn none_inside_a_batch_aborts() {
        let program: Eff<App, (i32, i32)> = Eff::pure(1).product(none());
        assert_eq!(run(run_option(program)), None);
    }

    #[rstest]
    fn detach_peels_into_option() {
        let finished: Eff<App, i32> = Eff::pure(5).map(|x| x * 2);
        assert_eq!(detach(finished), Some(10));

        let aborted: Eff<App, i32> = none();
        assert_eq!(detach(aborted), None);
    }
}

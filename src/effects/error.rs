//! Error effect: abort with a typed error, or recover in place.
//!
//! [`throw`] aborts the rest of the program; [`run_error`] materializes
//! the outcome as a `Result`; [`catch_error`] handles a thrown error in
//! place, leaving the error capability in the row for re-throws.

use std::marker::PhantomData;
use std::ops::ControlFlow;

use crate::eff::{send, Eff};
use crate::effect::{Effect, Request, Value};
use crate::handler::{intercept, interpret, Batched, Recurse};
use crate::member::{Member, MemberInOut};
use crate::row::Row;
use crate::runner::MonadEffect;

mod operations {
    use crate::effect::OperationTag;

    pub const THROW: OperationTag = OperationTag::new(60);
}

/// Error effect marker: the capability to abort with an `E`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorEffect<E>(PhantomData<E>);

impl<E: 'static> Effect for ErrorEffect<E> {
    const NAME: &'static str = "Error";
}

/// Aborts the program with an error.
#[must_use]
pub fn throw<E, A, R, I>(error: E) -> Eff<R, A>
where
    E: Clone + 'static,
    A: 'static,
    R: Member<ErrorEffect<E>, I>,
{
    send::<ErrorEffect<E>, R, I, A>(Request::new(operations::THROW, error))
}

#[derive(Clone)]
struct ErrorRecurse<E>(PhantomData<E>);

impl<E, U, A> Recurse<ErrorEffect<E>, U, Result<A, E>> for ErrorRecurse<E>
where
    E: Clone + 'static,
    U: Row,
    A: 'static,
{
    fn apply(&mut self, request: Request<ErrorEffect<E>>) -> Result<Value, Eff<U, Result<A, E>>> {
        match request.operation() {
            operations::THROW => Err(Eff::pure(Err(request.arguments::<E>()))),
            unknown => panic!("unknown Error operation: {unknown:?}"),
        }
    }

    fn applicative(&mut self, requests: Vec<Request<ErrorEffect<E>>>) -> Batched<ErrorEffect<E>> {
        // The first throw in the batch wins; compress and short-circuit
        // on the monadic path.
        let mut requests = requests;
        Batched::Compressed(requests.swap_remove(0))
    }
}

/// Runs the error effect, returning `Ok` for finished programs and the
/// first thrown error otherwise.
#[must_use]
pub fn run_error<E, I, R, A>(effect: Eff<R, A>) -> Eff<R::Out, Result<A, E>>
where
    E: Clone + 'static,
    I: 'static,
    R: Member<ErrorEffect<E>, I>,
    R::Out: Row,
    A: Clone + 'static,
{
    interpret::<ErrorEffect<E>, I, R, R::Out, A, Result<A, E>, _, _>(
        effect,
        Ok,
        ErrorRecurse(PhantomData),
    )
}

#[derive(Clone)]
struct CatchRecurse<H, E> {
    handle: H,
    _error: PhantomData<E>,
}

impl<E, R, A, H> Recurse<ErrorEffect<E>, R, A> for CatchRecurse<H, E>
where
    E: Clone + 'static,
    R: Row,
    A: 'static,
    H: Fn(E) -> Eff<R, A>,
{
    fn apply(&mut self, request: Request<ErrorEffect<E>>) -> Result<Value, Eff<R, A>> {
        match request.operation() {
            operations::THROW => Err((self.handle)(request.arguments::<E>())),
            unknown => panic!("unknown Error operation: {unknown:?}"),
        }
    }

    fn applicative(&mut self, requests: Vec<Request<ErrorEffect<E>>>) -> Batched<ErrorEffect<E>> {
        let mut requests = requests;
        Batched::Compressed(requests.swap_remove(0))
    }
}

/// Handles a thrown error in place.
///
/// The continuation of the failed program is discarded and `handle`
/// takes over; the error capability stays in the row, so the handler
/// may itself re-throw.
#[must_use]
pub fn catch_error<E, I, R, A, H>(effect: Eff<R, A>, handle: H) -> Eff<R, A>
where
    E: Clone + 'static,
    I: 'static,
    R: MemberInOut<ErrorEffect<E>, I>,
    A: Clone + 'static,
    H: Fn(E) -> Eff<R, A> + Clone + 'static,
{
    intercept::<ErrorEffect<E>, I, R, A, A, _, _>(
        effect,
        |value: A| value,
        CatchRecurse {
            handle,
            _error: PhantomData,
        },
    )
}

impl<E: Clone + 'static> MonadEffect for ErrorEffect<E> {
    type Target<T: 'static> = Result<T, E>;

    fn pure<T: 'static>(value: T) -> Result<T, E> {
        Ok(value)
    }

    fn map<T: 'static, O: 'static>(
        target: Result<T, E>,
        function: impl FnOnce(T) -> O,
    ) -> Result<O, E> {
        target.map(function)
    }

    fn embed(request: Request<Self>) -> Result<Value, E> {
        match request.operation() {
            operations::THROW => Err(request.arguments::<E>()),
            unknown => panic!("unknown Error operation: {unknown:?}"),
        }
    }

    fn tail_rec<S: 'static, T: 'static>(
        initial: S,
        mut step: impl FnMut(S) -> Result<ControlFlow<T, S>, E>,
    ) -> Result<T, E> {
        let mut state = initial;
        loop {
            match step(state)? {
                ControlFlow::Continue(next) => state = next,
                ControlFlow::Break(finished) => return Ok(finished),
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

    type App = Fx1<ErrorEffect<String>>;

    #[rstest]
    fn a_finished_program_is_ok() {
        let program: Eff<App, i32> = Eff::pure(42);
        assert_eq!(run(run_error(program)), Ok(42));
    }

    #[rstest]
    fn throw_aborts_with_the_error() {
        let program: Eff<App, i32> =
            throw::<String, i32, App, _>("boom".to_string()).map(|x: i32| x + 1);
        assert_eq!(run(run_error(program)), Err("boom".to_string()));
    }

    #[rstest]
    fn catch_error_recovers_in_place() {
        let program: Eff<App, i32> = throw("boom".to_string());
        let recovered = catch_error(program, |error: String| Eff::pure(error.len() as i32));
        assert_eq!(run(run_error(recovered)), Ok(4));
    }

    #[rstest]
    fn catch_error_passes_finished_programs_through() {
        let program: Eff<App, i32> = Eff::pure(7);
        let recovered = catch_error(program, |_: String| Eff::pure(0));
        assert_eq!(run(run_error(recovered)), Ok(7));
    }

    #[rstest]
    fn catch_error_may_rethrow() {
        let program: Eff<App, i32> = throw("first".to_string());
        let recovered = catch_error(program, |error: String| throw(format!("re: {error}")));
        assert_eq!(run(run_error(recovered)), Err("re: first".to_string()));
    }

    #[rstest]
    fn detach_peels_into_result() {
        let finished: Eff<App, i32> = Eff::pure(3);
        assert_eq!(detach(finished), Ok(3));

        let failed: Eff<App, i32> = throw("gone".to_string());
        assert_eq!(detach(failed), Err("gone".to_string()));
    }

    #[rstest]
    fn a_throw_inside_a_batch_aborts() {
        let program: Eff<App, (i32, i32)> = Eff::pure(1).product(throw("batch".to_string()));
        assert_eq!(run(run_error(program)), Err("batch".to_string()));
    }
}

//! Reader effect: access a shared environment.
//!
//! # Operations
//!
//! - [`ask`]: retrieves the environment
//! - [`asks`]: retrieves a projection of the environment

use std::marker::PhantomData;

use crate::eff::{send, Eff};
use crate::effect::{value, Effect, Request, Value};
use crate::handler::{interpret, Recurse};
use crate::member::Member;
use crate::row::Row;

mod operations {
    use crate::effect::OperationTag;

    pub const ASK: OperationTag = OperationTag::new(30);
}

/// Reader effect marker: the capability to read an environment `E`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReaderEffect<E>(PhantomData<E>);

impl<E: 'static> Effect for ReaderEffect<E> {
    const NAME: &'static str = "Reader";
}

/// Retrieves the environment.
#[must_use]
pub fn ask<E, R, I>() -> Eff<R, E>
where
    E: Clone + 'static,
    R: Member<ReaderEffect<E>, I>,
{
    send::<ReaderEffect<E>, R, I, E>(Request::new(operations::ASK, ()))
}

/// Retrieves a projection of the environment.
#[must_use]
pub fn asks<E, T, R, I>(projection: impl Fn(&E) -> T + 'static) -> Eff<R, T>
where
    E: Clone + 'static,
    T: 'static,
    R: Member<ReaderEffect<E>, I>,
{
    ask().map(move |environment| projection(&environment))
}

#[derive(Clone)]
struct ReaderRecurse<E> {
    environment: E,
}

impl<E, U, B> Recurse<ReaderEffect<E>, U, B> for ReaderRecurse<E>
where
    E: Clone + 'static,
    U: Row,
    B: 'static,
{
    fn apply(&mut self, request: Request<ReaderEffect<E>>) -> Result<Value, Eff<U, B>> {
        match request.operation() {
            operations::ASK => Ok(value(self.environment.clone())),
            unknown => panic!("unknown Reader operation: {unknown:?}"),
        }
    }

    fn applicative(
        &mut self,
        requests: Vec<Request<ReaderEffect<E>>>,
    ) -> crate::handler::Batched<ReaderEffect<E>> {
        crate::handler::Batched::Answers(
            requests
                .into_iter()
                .map(|_| value(self.environment.clone()))
                .collect(),
        )
    }
}

/// Runs the reader effect against a fixed environment.
#[must_use]
pub fn run_reader<E, I, R, A>(effect: Eff<R, A>, environment: E) -> Eff<R::Out, A>
where
    E: Clone + 'static,
    I: 'static,
    R: Member<ReaderEffect<E>, I>,
    R::Out: Row,
    A: Clone + 'static,
{
    interpret::<ReaderEffect<E>, I, R, R::Out, A, A, _, _>(
        effect,
        |result: A| result,
        ReaderRecurse { environment },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Fx1;
    use crate::runner::run;
    use rstest::rstest;

    type App = Fx1<ReaderEffect<i32>>;

    #[rstest]
    fn ask_reads_the_environment() {
        let program: Eff<App, i32> = ask();
        assert_eq!(run(run_reader(program, 123)), 123);
    }

    #[rstest]
    fn asks_projects_the_environment() {
        type Config = Fx1<ReaderEffect<Vec<i32>>>;
        let program: Eff<Config, usize> = asks(|config: &Vec<i32>| config.len());
        assert_eq!(run(run_reader(program, vec![1, 2, 3])), 3);
    }

    #[rstest]
    fn batched_asks_all_see_the_same_environment() {
        let program: Eff<App, (i32, i32)> = ask().product(ask());
        assert_eq!(run(run_reader(program, 7)), (7, 7));
    }

    #[rstest]
    fn ask_composes_monadically() {
        let program: Eff<App, i32> = ask().flat_map(|x: i32| ask().map(move |y: i32| x + y));
        assert_eq!(run(run_reader(program, 20)), 40);
    }
}

//! Writer effect: accumulate output alongside a computation.
//!
//! # Operations
//!
//! - [`tell`]: appends one output to the log
//!
//! # Examples
//!
//! ```rust
//! use effrow::prelude::*;
//! use effrow::effects::writer::{run_writer, tell, WriterEffect};
//!
//! type App = Fx![WriterEffect<&'static str>];
//!
//! let program: Eff<App, i32> = tell("a").then(tell("b")).then(Eff::pure(7));
//! let (result, log) = run(run_writer(program));
//! assert_eq!(result, 7);
//! assert_eq!(log, vec!["a", "b"]);
//! ```

use std::marker::PhantomData;

use crate::eff::{send, Eff};
use crate::effect::{value, Effect, Request, Value};
use crate::handler::{run_fold, LeftFold};
use crate::member::Member;
use crate::row::Row;

mod operations {
    use crate::effect::OperationTag;

    pub const TELL: OperationTag = OperationTag::new(20);
}

/// Writer effect marker: the capability to append outputs of type `W`.
#[derive(Debug, Clone, Copy)]
pub struct WriterEffect<W>(PhantomData<W>);

impl<W: 'static> Effect for WriterEffect<W> {
    const NAME: &'static str = "Writer";
}

/// Appends one output to the log.
#[must_use]
pub fn tell<W, R, I>(output: W) -> Eff<R, ()>
where
    W: Clone + 'static,
    R: Member<WriterEffect<W>, I>,
{
    send::<WriterEffect<W>, R, I, ()>(Request::new(operations::TELL, output))
}

#[derive(Clone)]
struct WriterFold<W>(PhantomData<W>);

impl<W, A> LeftFold<WriterEffect<W>, A, (A, Vec<W>)> for WriterFold<W>
where
    W: Clone + 'static,
    A: 'static,
{
    type State = Vec<W>;

    fn init(&mut self) -> Vec<W> {
        Vec::new()
    }

    fn fold(&mut self, mut log: Vec<W>, request: Request<WriterEffect<W>>) -> (Value, Vec<W>) {
        match request.operation() {
            operations::TELL => {
                log.push(request.arguments::<W>());
                (value(()), log)
            }
            unknown => panic!("unknown Writer operation: {unknown:?}"),
        }
    }

    fn finalize(&mut self, result: A, log: Vec<W>) -> (A, Vec<W>) {
        (result, log)
    }
}

/// Runs the writer effect, returning the result and the accumulated
/// log in append order.
#[must_use]
pub fn run_writer<W, I, R, A>(effect: Eff<R, A>) -> Eff<R::Out, (A, Vec<W>)>
where
    W: Clone + 'static,
    I: 'static,
    R: Member<WriterEffect<W>, I>,
    R::Out: Row,
    A: Clone + 'static,
{
    run_fold::<WriterEffect<W>, I, R, R::Out, A, (A, Vec<W>), _>(effect, WriterFold(PhantomData))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Fx1;
    use crate::runner::run;
    use rstest::rstest;

    type App = Fx1<WriterEffect<String>>;

    #[rstest]
    fn tell_appends_to_the_log() {
        let program: Eff<App, ()> = tell("hello".to_string());
        let ((), log) = run(run_writer(program));
        assert_eq!(log, vec!["hello".to_string()]);
    }

    #[rstest]
    fn tells_accumulate_in_order() {
        let program: Eff<App, ()> = tell("a".to_string())
            .then(tell("b".to_string()))
            .then(tell("c".to_string()));
        let ((), log) = run(run_writer(program));
        assert_eq!(log, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[rstest]
    fn a_pure_program_has_an_empty_log() {
        let program: Eff<App, i32> = Eff::pure(42);
        let (result, log) = run(run_writer(program));
        assert_eq!(result, 42);
        assert!(log.is_empty());
    }

    #[rstest]
    fn batched_tells_keep_presentation_order() {
        let program: Eff<App, ((), ())> =
            tell("left".to_string()).product(tell("right".to_string()));
        let (_, log) = run(run_writer(program));
        assert_eq!(log, vec!["left".to_string(), "right".to_string()]);
    }

    #[rstest]
    fn deep_writer_chains_are_stack_safe() {
        let mut program: Eff<Fx1<WriterEffect<i64>>, ()> = Eff::pure(());
        for index in 0..50_000 {
            program = program.then(tell(index));
        }
        let ((), log) = run(run_writer(program));
        assert_eq!(log.len(), 50_000);
        assert_eq!(log[0], 0);
        assert_eq!(log[49_999], 49_999);
    }
}

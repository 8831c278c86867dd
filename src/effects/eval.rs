//! Eval effect: suspended evaluation.
//!
//! A [`delay`]ed thunk is not forced when the program is built; the
//! interpreter forces it when the program runs, once per resumption.

use std::rc::Rc;

use crate::eff::{send, Eff};
use crate::effect::{value, Effect, Request, Value};
use crate::handler::{interpret, Recurse};
use crate::member::Member;
use crate::row::Row;

mod operations {
    use crate::effect::OperationTag;

    pub const DELAY: OperationTag = OperationTag::new(40);
}

/// Eval effect marker: the capability to suspend evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EvalEffect;

impl Effect for EvalEffect {
    const NAME: &'static str = "Eval";
}

/// A suspended computation carried as a request argument.
#[derive(Clone)]
struct Thunk(Rc<dyn Fn() -> Value>);

/// Suspends a computation until the program is interpreted.
#[must_use]
pub fn delay<A, R, I>(thunk: impl Fn() -> A + 'static) -> Eff<R, A>
where
    A: 'static,
    R: Member<EvalEffect, I>,
{
    let suspended = Thunk(Rc::new(move || value(thunk())));
    send::<EvalEffect, R, I, A>(Request::new(operations::DELAY, suspended))
}

#[derive(Clone)]
struct EvalRecurse;

impl<U, B> Recurse<EvalEffect, U, B> for EvalRecurse
where
    U: Row,
    B: 'static,
{
    fn apply(&mut self, request: Request<EvalEffect>) -> Result<Value, Eff<U, B>> {
        match request.operation() {
            operations::DELAY => Ok((request.arguments::<Thunk>().0)()),
            unknown => panic!("unknown Eval operation: {unknown:?}"),
        }
    }

    fn applicative(
        &mut self,
        requests: Vec<Request<EvalEffect>>,
    ) -> crate::handler::Batched<EvalEffect> {
        crate::handler::Batched::Answers(
            requests
                .into_iter()
                .map(|request| (request.arguments::<Thunk>().0)())
                .collect(),
        )
    }
}

/// Runs the eval effect, forcing suspended thunks in program order.
#[must_use]
pub fn run_eval<I, R, A>(effect: Eff<R, A>) -> Eff<R::Out, A>
where
    I: 'static,
    R: Member<EvalEffect, I>,
    R::Out: Row,
    A: Clone + 'static,
{
    interpret::<EvalEffect, I, R, R::Out, A, A, _, _>(effect, |result: A| result, EvalRecurse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Fx1;
    use crate::runner::run;
    use rstest::rstest;
    use std::cell::Cell;

    type App = Fx1<EvalEffect>;

    #[rstest]
    fn delay_suspends_until_run() {
        let forced = Rc::new(Cell::new(false));
        let witness = Rc::clone(&forced);
        let program: Eff<App, i32> = delay(move || {
            witness.set(true);
            42
        });
        assert!(!forced.get());
        assert_eq!(run(run_eval(program)), 42);
        assert!(forced.get());
    }

    #[rstest]
    fn delayed_steps_run_in_program_order() {
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));
        let first = Rc::clone(&order);
        let second = Rc::clone(&order);
        let program: Eff<App, i32> = delay(move || {
            first.borrow_mut().push(1);
            10
        })
        .flat_map(move |x| {
            let second = Rc::clone(&second);
            delay(move || {
                second.borrow_mut().push(2);
                x + 1
            })
        });
        assert_eq!(run(run_eval(program)), 11);
        assert_eq!(*order.borrow(), vec![1, 2]);
    }
}

//! List effect: non-deterministic choice over alternatives.
//!
//! A [`from_vec`] invocation offers its alternatives one at a time; the
//! interpreter explores every branch and collects the results.
//!
//! # Ordering
//!
//! - Monadic branching is depth-first in definition order: the program
//!   continues with the first alternative to completion before the
//!   second is tried.
//! - An applicative batch enumerates the cross product of its
//!   alternative lists with the leftmost operand varying fastest, which
//!   is the list-applicative order of `functions.ap(operands)`.
//!
//! # Examples
//!
//! ```rust
//! use effrow::prelude::*;
//! use effrow::effects::list::{from_vec, run_list, ListEffect};
//!
//! type App = Fx![ListEffect];
//!
//! let program: Eff<App, i32> = from_vec(vec![1, 2, 3])
//!     .flat_map(|x: i32| from_vec(vec![10, 20]).map(move |y: i32| x * y));
//! assert_eq!(run(run_list(program)), vec![10, 20, 20, 40, 30, 60]);
//! ```

use std::marker::PhantomData;

use crate::eff::{send, Eff};
use crate::effect::{value, Effect, Request, Value};
use crate::interpret::{interpret_loop, BatchContinuation, Continuation, Loop, Step};
use crate::member::Member;
use crate::row::Row;

mod operations {
    use crate::effect::OperationTag;

    pub const VALUES: OperationTag = OperationTag::new(70);
}

/// List effect marker: the capability to branch over alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListEffect;

impl Effect for ListEffect {
    const NAME: &'static str = "List";
}

/// Branches over the given alternatives, in order.
#[must_use]
pub fn from_vec<A, R, I>(alternatives: Vec<A>) -> Eff<R, A>
where
    A: 'static,
    R: Member<ListEffect, I>,
{
    let erased: Vec<Value> = alternatives.into_iter().map(value).collect();
    send::<ListEffect, R, I, A>(Request::new(operations::VALUES, erased))
}

/// A branch with no alternatives: the program produces no results.
#[must_use]
pub fn empty<A, R, I>() -> Eff<R, A>
where
    A: 'static,
    R: Member<ListEffect, I>,
{
    from_vec(Vec::new())
}

/// A branch with exactly one alternative.
#[must_use]
pub fn singleton<A, R, I>(alternative: A) -> Eff<R, A>
where
    A: 'static,
    R: Member<ListEffect, I>,
{
    from_vec(vec![alternative])
}

/// Exploration state: branches still to run, results so far.
struct Exploration<R: Row, A: 'static> {
    pending: Vec<Eff<R, A>>,
    results: Vec<A>,
}

impl<R: Row, A: Clone + 'static> Clone for Exploration<R, A> {
    fn clone(&self) -> Self {
        Self {
            pending: self.pending.clone(),
            results: self.results.clone(),
        }
    }
}

struct ListInterpreter<U>(PhantomData<U>);

impl<U> Clone for ListInterpreter<U> {
    fn clone(&self) -> Self {
        Self(PhantomData)
    }
}

impl<U: Row> ListInterpreter<U> {
    /// Runs the next pending branch, or finishes with the collected
    /// results.
    fn advance<R: Row, A: Clone + 'static>(
        mut exploration: Exploration<R, A>,
    ) -> Step<R, A, Exploration<R, A>, Eff<U, Vec<A>>> {
        match exploration.pending.pop() {
            Some(next) => Step::Continue(next, exploration),
            None => Step::Done(Eff::pure(exploration.results)),
        }
    }

    /// Queues branches in definition order (the stack pops from the
    /// back, so they are pushed reversed).
    fn push_branches<R: Row, A: 'static>(
        exploration: &mut Exploration<R, A>,
        branches: Vec<Eff<R, A>>,
    ) {
        exploration.pending.extend(branches.into_iter().rev());
    }
}

impl<R, U, A> Loop<ListEffect, R, A, U, Vec<A>> for ListInterpreter<U>
where
    R: Row,
    U: Row,
    A: Clone + 'static,
{
    type State = Exploration<R, A>;

    fn on_pure(
        &mut self,
        finished: A,
        mut exploration: Exploration<R, A>,
    ) -> Step<R, A, Exploration<R, A>, Eff<U, Vec<A>>> {
        exploration.results.push(finished);
        Self::advance(exploration)
    }

    fn on_effect(
        &mut self,
        request: Request<ListEffect>,
        continuation: Continuation<R, A>,
        mut exploration: Exploration<R, A>,
    ) -> Step<R, A, Exploration<R, A>, Eff<U, Vec<A>>> {
        let alternatives = match request.operation() {
            operations::VALUES => request.arguments::<Vec<Value>>(),
            unknown => panic!("unknown List operation: {unknown:?}"),
        };
        let branches = alternatives
            .into_iter()
            .map(|alternative| continuation.resume_erased(alternative))
            .collect();
        Self::push_branches(&mut exploration, branches);
        Self::advance(exploration)
    }

    fn on_applicative(
        &mut self,
        requests: Vec<Request<ListEffect>>,
        continuation: BatchContinuation<R, A>,
        mut exploration: Exploration<R, A>,
    ) -> Step<R, A, Exploration<R, A>, Eff<U, Vec<A>>> {
        let lists: Vec<Vec<Value>> = requests
            .into_iter()
            .map(|request| match request.operation() {
                operations::VALUES => request.arguments::<Vec<Value>>(),
                unknown => panic!("unknown List operation: {unknown:?}"),
            })
            .collect();
        let combinations: usize = lists.iter().map(Vec::len).product();
        let mut branches = Vec::with_capacity(combinations);
        for index in 0..combinations {
            // Odometer enumeration: the leftmost list varies fastest.
            let mut remainder = index;
            let combination = lists
                .iter()
                .map(|alternatives| {
                    let choice = alternatives[remainder % alternatives.len()].clone();
                    remainder /= alternatives.len();
                    choice
                })
                .collect();
            branches.push(continuation.resume(combination));
        }
        Self::push_branches(&mut exploration, branches);
        Self::advance(exploration)
    }
}

/// Runs the list effect, collecting the result of every branch in
/// exploration order.
#[must_use]
pub fn run_list<I, R, A>(effect: Eff<R, A>) -> Eff<R::Out, Vec<A>>
where
    I: 'static,
    R: Member<ListEffect, I>,
    R::Out: Row,
    A: Clone + 'static,
{
    interpret_loop::<ListEffect, I, R, R::Out, A, Vec<A>, _>(
        effect,
        ListInterpreter(PhantomData),
        Exploration {
            pending: Vec::new(),
            results: Vec::new(),
        },
    )
}

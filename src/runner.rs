//! Terminal execution over trivial rows.
//!
//! Once every effect has been peeled off, [`run`] extracts the final
//! value. [`run_pure`] is its non-committal sibling, and [`detach`]
//! short-cuts a single-effect row straight into the effect's own
//! target monad.
//!
//! Calling [`run`] on a program that still contains effects is a row
//! discipline violation — a programmer error, reported by a fatal
//! panic naming the offending node.

use std::ops::ControlFlow;

use crate::eff::{Eff, EffInner};
use crate::effect::{Effect, Request, Value};
use crate::member::{Here, Member};
use crate::row::{Fx1, NoFx, Row};

/// Extracts the value of an effect-free program.
///
/// # Panics
///
/// Panics if an impure node remains: the program was not fully
/// interpreted before being run.
///
/// # Examples
///
/// ```rust
/// use effrow::prelude::*;
///
/// assert_eq!(run(Eff::<NoFx, i32>::pure(3)), 3);
/// ```
#[must_use]
pub fn run<A: 'static>(effect: Eff<NoFx, A>) -> A {
    match effect.into_inner() {
        EffInner::Pure(value) => value,
        EffInner::Impure { .. } => panic!(
            "run: an Impure node survived with no effects left in the row"
        ),
        EffInner::ImpureAp { .. } => panic!(
            "run: an ImpureAp node survived with no effects left in the row"
        ),
    }
}

/// The value of a program, if it is already finished.
///
/// # Examples
///
/// ```rust
/// use effrow::prelude::*;
///
/// assert_eq!(run_pure(Eff::<NoFx, i32>::pure(3)), Some(3));
/// ```
#[must_use]
pub fn run_pure<R: Row, A: 'static>(effect: Eff<R, A>) -> Option<A> {
    match effect.into_inner() {
        EffInner::Pure(value) => Some(value),
        EffInner::Impure { .. } | EffInner::ImpureAp { .. } => None,
    }
}

/// An effect whose requests embed into a target monad, so a
/// single-effect program can be peeled directly into it.
///
/// `tail_rec` is the module's iteration primitive: [`detach`] drives
/// the whole program through it, so a module with an iterative
/// implementation gets a stack-safe `detach` for free — there is no
/// recursion inside the bind.
pub trait MonadEffect: Effect + Sized {
    /// The target monad.
    type Target<T: 'static>;

    /// Lifts a finished value.
    fn pure<T: 'static>(value: T) -> Self::Target<T>;

    /// Maps over the target.
    fn map<T: 'static, O: 'static>(
        target: Self::Target<T>,
        function: impl FnOnce(T) -> O,
    ) -> Self::Target<O>;

    /// Interprets one request into the target monad.
    fn embed(request: Request<Self>) -> Self::Target<Value>;

    /// Iterates `step` from `initial` until it breaks with a final
    /// value, inside the target monad.
    fn tail_rec<S: 'static, T: 'static>(
        initial: S,
        step: impl FnMut(S) -> Self::Target<ControlFlow<T, S>>,
    ) -> Self::Target<T>;
}

/// Peels a single-effect program into the effect's target monad.
///
/// Applicative nodes are normalized to their monadic form first; the
/// program is then a straight line of requests the target monad binds
/// together.
///
/// # Panics
///
/// Panics if the row's only member fails to project — impossible for
/// programs built through the public constructors.
#[must_use]
pub fn detach<M, A>(effect: Eff<Fx1<M>, A>) -> M::Target<A>
where
    M: MonadEffect,
    A: Clone + 'static,
{
    M::tail_rec(effect, |current| {
        match current.to_monadic().into_inner() {
            EffInner::Pure(value) => M::pure(ControlFlow::Break(value)),
            EffInner::Impure { union, queue, .. } => {
                let request = <Fx1<M> as Member<M, Here>>::project(union).unwrap_or_else(|_| {
                    panic!("detach: a foreign effect inhabits a single-effect row")
                });
                M::map(M::embed(request), move |answer: Value| {
                    ControlFlow::Continue(Eff::from_erased(queue.apply_erased(answer)))
                })
            }
            EffInner::ImpureAp { .. } => {
                unreachable!("to_monadic leaves no applicative nodes")
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn run_extracts_a_pure_value() {
        assert_eq!(run(Eff::<NoFx, &str>::pure("done")), "done");
    }

    #[rstest]
    fn run_pure_is_some_only_for_finished_programs() {
        assert_eq!(run_pure(Eff::<NoFx, i32>::pure(1)), Some(1));
    }
}

//! Row weakening: lifting a program into a larger row.
//!
//! A program written against a small row can run wherever a superset of
//! its effects is available. [`IntoRow`] is the structural witness that
//! every effect of `R` appears in `U`, and [`eff_into`] performs the
//! lift: pure values pass through unchanged, effect tags are remapped,
//! and continuations are converted lazily so arbitrarily deep programs
//! lift in bounded stack.
//!
//! The second type parameter of `IntoRow` is the list of membership
//! indices, one per effect of `R`, threaded as nested pairs. For
//! well-formed rows it is inferred; annotate it only when the same
//! effect appears in several candidate positions of `U`.
//!
//! # Examples
//!
//! ```rust
//! use effrow::prelude::*;
//! use effrow::effects::state::StateEffect;
//! use effrow::effects::writer::{run_writer, tell, WriterEffect};
//!
//! type Small = Fx![WriterEffect<String>];
//! type Large = Fx![WriterEffect<String>, StateEffect<i32>];
//!
//! let small: Eff<Small, i32> = tell("x".to_string()).then(Eff::pure(1));
//! let large: Eff<Large, i32> = eff_into(small);
//! # let _ = large;
//! ```

use crate::eff::{Eff, EffInner};
use crate::effect::{Effect, Value};
use crate::member::Member;
use crate::row::{Row, RowCons, RowNil};
use crate::union::Union;
use std::marker::PhantomData;

use crate::arrs::Arrs;

/// Witness that every effect of this row appears in `U`.
///
/// `Indices` is the type-level list of membership indices, one per
/// effect of the row, as nested pairs `(I, Rest)` terminated by `()`.
pub trait IntoRow<U: Row, Indices>: Row {
    /// Re-tags one invocation for the larger row.
    fn remap(union: Union<Self>) -> Union<U>
    where
        Self: Sized;
}

impl<U: Row> IntoRow<U, ()> for RowNil {
    fn remap(_union: Union<Self>) -> Union<U> {
        unreachable!("the empty row carries no effects")
    }
}

impl<E, Tail, U, I, Rest> IntoRow<U, (I, Rest)> for RowCons<E, Tail>
where
    E: Effect,
    Tail: Row + IntoRow<U, Rest>,
    U: Member<E, I>,
{
    fn remap(union: Union<Self>) -> Union<U> {
        if union.index() == 0 {
            <U as Member<E, I>>::inject(union.into_request())
        } else {
            Tail::remap(union.shift_down())
        }
    }
}

/// Lifts a program into any row containing its effects.
///
/// The lift is the identity on values: no effect is added, removed, or
/// reordered, and applicative batches keep their size and positions.
#[must_use]
pub fn eff_into<R, U, Indices, A>(effect: Eff<R, A>) -> Eff<U, A>
where
    R: IntoRow<U, Indices>,
    U: Row,
    Indices: 'static,
    A: Clone + 'static,
{
    Eff::from_erased(weaken::<R, U, Indices>(effect.erase()))
}

fn weaken<R, U, Indices>(effect: Eff<R, Value>) -> Eff<U, Value>
where
    R: IntoRow<U, Indices>,
    U: Row,
    Indices: 'static,
{
    match effect.into_inner() {
        EffInner::Pure(payload) => Eff::pure(payload),
        EffInner::Impure { union, queue, .. } => Eff::impure(
            <R as IntoRow<U, Indices>>::remap(union),
            Arrs::singleton_raw(move |answer: Value| {
                weaken::<R, U, Indices>(queue.apply_erased(answer))
            }),
        ),
        EffInner::ImpureAp { unions, zipper, .. } => Eff::from_inner(EffInner::ImpureAp {
            unions: unions.into_map(<R as IntoRow<U, Indices>>::remap),
            zipper,
            _result: PhantomData,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::state::{get, run_state, StateEffect};
    use crate::effects::writer::{run_writer, tell, WriterEffect};
    use crate::row::{Fx1, Fx2};
    use crate::runner::{run, run_pure};
    use rstest::rstest;

    type Small = Fx1<WriterEffect<String>>;
    type Large = Fx2<WriterEffect<String>, StateEffect<i32>>;

    #[rstest]
    fn weakening_is_identity_on_values() {
        let lifted: Eff<Large, i32> = eff_into(Eff::<Small, i32>::pure(9));
        assert_eq!(run_pure(lifted), Some(9));
    }

    #[rstest]
    fn weakening_preserves_monadic_effects() {
        let small: Eff<Small, i32> =
            tell("a".to_string()).flat_map(|()| tell("b".to_string()).then(Eff::pure(5)));
        let lifted: Eff<Large, i32> = eff_into(small);
        let (result, log) = run(run_state(run_writer(lifted), 0)).0;
        assert_eq!(result, 5);
        assert_eq!(log, vec!["a".to_string(), "b".to_string()]);
    }

    #[rstest]
    fn weakening_preserves_applicative_batches() {
        let small: Eff<Small, (i32, i32)> = tell("x".to_string())
            .then(Eff::pure(1))
            .product(tell("y".to_string()).then(Eff::pure(2)));
        let lifted: Eff<Large, (i32, i32)> = eff_into(small);
        let ((pair, log), state) = run(run_state(run_writer(lifted), 7));
        assert_eq!(pair, (1, 2));
        assert_eq!(log, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(state, 7);
    }

    #[rstest]
    fn weakening_remaps_into_a_deeper_position() {
        type Shifted = Fx2<StateEffect<i32>, WriterEffect<String>>;
        let small: Eff<Small, i32> = tell("deep".to_string()).then(Eff::pure(3));
        let lifted: Eff<Shifted, i32> = eff_into(small);
        let ((result, state), log) = run(run_writer(run_state(lifted, 1)));
        assert_eq!(result, 3);
        assert_eq!(state, 1);
        assert_eq!(log, vec!["deep".to_string()]);
    }

    #[rstest]
    fn state_programs_survive_the_lift() {
        type JustState = Fx1<StateEffect<i32>>;
        let small: Eff<JustState, i32> = get();
        let lifted: Eff<Large, i32> = eff_into(small);
        let ((result, log), state) = run(run_state(run_writer(lifted), 11));
        assert_eq!(result, 11);
        assert!(log.is_empty());
        assert_eq!(state, 11);
    }
}

//! Membership witnesses locating an effect inside a row.
//!
//! The index pattern tracks an effect's position at the type level:
//! [`Here`] means the effect heads the row, [`There<I>`] that it sits at
//! index `I` of the tail. Searching is head-first, so for well-formed
//! rows (no duplicate effect) trait resolution finds exactly one index
//! and the `Index` parameter of [`Member`] is inferred at call sites.
//!
//! Two witnesses exist:
//!
//! - [`Member`] — the removing witness: `project` splits a union into
//!   "the targeted effect" or "a union over the row minus that effect"
//!   (`Out`), and `accept` re-embeds the smaller row. Handlers that peel
//!   an effect off the row use this.
//! - [`MemberInOut`] — the in-place witness: `extract` answers the same
//!   question but hands non-matching unions back unchanged. The
//!   `intercept` family uses this to rewrite effects without shrinking
//!   the row.
//!
//! # Laws
//!
//! Projecting an injected request recovers it:
//!
//! ```text
//! project(inject(request)) == Ok(request)
//! ```
//!
//! and `accept` is a right inverse of the non-matching side:
//!
//! ```text
//! project(accept(union)) == Err(union)
//! ```
//!
//! # Examples
//!
//! ```rust
//! use effrow::prelude::*;
//! use effrow::effects::reader::ReaderEffect;
//! use effrow::effects::state::StateEffect;
//!
//! type App = Fx![ReaderEffect<i32>, StateEffect<String>];
//!
//! // ReaderEffect<i32> heads the row; StateEffect<String> sits one deeper.
//! fn has_reader<R: Member<ReaderEffect<i32>, Here>>() {}
//! fn has_state<R: Member<StateEffect<String>, There<Here>>>() {}
//! has_reader::<App>();
//! has_state::<App>();
//! ```

use std::marker::PhantomData;

use crate::effect::{Effect, Request};
use crate::row::{Row, RowCons};
use crate::union::Union;

/// Index of an effect at the head of a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Here;

/// Index of an effect at position `I` of the row's tail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct There<I>(PhantomData<fn() -> I>);

/// Witness that effect `E` is a member of this row, with the machinery
/// to remove it.
///
/// `Out` is the row with this occurrence of `E` deleted. All three
/// operations are pure index arithmetic on the union tag; payloads are
/// never inspected.
pub trait Member<E: Effect, Index>: Row {
    /// The row with this occurrence of `E` removed.
    type Out: Row;

    /// Tags a request of `E` for this row.
    fn inject(request: Request<E>) -> Union<Self>
    where
        Self: Sized;

    /// Splits a union: the targeted effect, or the union re-tagged for
    /// the smaller row.
    ///
    /// # Errors
    ///
    /// Returns the union over [`Member::Out`] when it does not invoke
    /// `E`.
    fn project(union: Union<Self>) -> Result<Request<E>, Union<Self::Out>>
    where
        Self: Sized;

    /// Re-embeds a union over the smaller row, without inspecting the
    /// payload.
    fn accept(union: Union<Self::Out>) -> Union<Self>
    where
        Self: Sized;
}

impl<E: Effect, Tail: Row> Member<E, Here> for RowCons<E, Tail> {
    type Out = Tail;

    fn inject(request: Request<E>) -> Union<Self> {
        Union::tagged(0, request)
    }

    fn project(union: Union<Self>) -> Result<Request<E>, Union<Tail>> {
        if union.index() == 0 {
            Ok(union.into_request())
        } else {
            Err(union.shift_down())
        }
    }

    fn accept(union: Union<Tail>) -> Union<Self> {
        union.shift_up()
    }
}

impl<E: Effect, Head: Effect, Tail, I> Member<E, There<I>> for RowCons<Head, Tail>
where
    Tail: Row + Member<E, I>,
{
    type Out = RowCons<Head, <Tail as Member<E, I>>::Out>;

    fn inject(request: Request<E>) -> Union<Self> {
        Tail::inject(request).shift_up()
    }

    fn project(union: Union<Self>) -> Result<Request<E>, Union<Self::Out>> {
        if union.index() == 0 {
            // The head effect keeps position zero in the smaller row.
            Err(union.retag())
        } else {
            match Tail::project(union.shift_down()) {
                Ok(request) => Ok(request),
                Err(other) => Err(other.shift_up()),
            }
        }
    }

    fn accept(union: Union<Self::Out>) -> Union<Self> {
        if union.index() == 0 {
            union.retag()
        } else {
            Tail::accept(union.shift_down()).shift_up()
        }
    }
}

/// Witness that effect `E` is a member of this row, without removing
/// it.
///
/// This is the weaker witness the `intercept` family relies on: a
/// non-matching union is handed back unchanged, so rewritten programs
/// stay in the same row. Every [`Member`] gives rise to one.
pub trait MemberInOut<E: Effect, Index>: Row {
    /// Tags a request of `E` for this row.
    fn inject(request: Request<E>) -> Union<Self>
    where
        Self: Sized;

    /// The targeted effect, or the union unchanged.
    ///
    /// # Errors
    ///
    /// Returns the original union when it does not invoke `E`.
    fn extract(union: Union<Self>) -> Result<Request<E>, Union<Self>>
    where
        Self: Sized;
}

impl<E: Effect, Index, R> MemberInOut<E, Index> for R
where
    R: Member<E, Index>,
{
    fn inject(request: Request<E>) -> Union<Self> {
        <R as Member<E, Index>>::inject(request)
    }

    fn extract(union: Union<Self>) -> Result<Request<E>, Union<Self>> {
        <R as Member<E, Index>>::project(union).map_err(<R as Member<E, Index>>::accept)
    }
}

//! Tagged unions over an effect row, and ordered batches of them.
//!
//! A [`Union`] is one effect invocation tagged with its position in a
//! row. A [`Unions`] is a non-empty ordered batch of them — the payload
//! of an applicative node. [`CollectedUnions`] is the partition of a
//! batch produced by a membership witness, keeping enough positional
//! bookkeeping to reassemble interpreter outputs in the original order.
//!
//! # Invariants
//!
//! - `Unions` is never empty; its `size` equals one plus the tail
//!   length.
//! - The `indices`/`other_indices` of a `CollectedUnions` partition
//!   `0..size` exactly; [`reorder`] relies on this to restore the batch
//!   order and panics (fatally) if a position is missing.
//! - Payloads are opaque to this module; only the tag moves.

use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::effect::{Effect, OperationTag, Request, Value};
use crate::member::{Member, MemberInOut};
use crate::row::Row;

/// Positional indices of a partitioned batch; batches are short, so the
/// bookkeeping stays inline.
pub type Positions = SmallVec<[usize; 8]>;

/// One effect invocation tagged with its position in the row `R`.
///
/// The answer type of the invocation is not tracked here; the
/// continuation that consumes the answer claims it. Equality and
/// identity of payloads are never inspected.
pub struct Union<R: Row> {
    index: usize,
    operation: OperationTag,
    arguments: Value,
    _row: PhantomData<fn() -> R>,
}

impl<R: Row> Union<R> {
    /// Builds a union at the given row position.
    pub(crate) fn tagged<E: Effect>(index: usize, request: Request<E>) -> Self {
        let (operation, arguments) = request.into_parts();
        Self {
            index,
            operation,
            arguments,
            _row: PhantomData,
        }
    }

    /// Position of the invoked effect inside `R`, head first.
    #[must_use]
    #[inline]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Re-tags this union for another row, keeping the position.
    ///
    /// Only the membership witnesses call this; they guarantee the
    /// position means the same effect in the target row.
    pub(crate) fn retag<U: Row>(self) -> Union<U> {
        Union {
            index: self.index,
            operation: self.operation,
            arguments: self.arguments,
            _row: PhantomData,
        }
    }

    /// Re-tags with the position moved one slot deeper.
    pub(crate) fn shift_up<U: Row>(self) -> Union<U> {
        Union {
            index: self.index + 1,
            operation: self.operation,
            arguments: self.arguments,
            _row: PhantomData,
        }
    }

    /// Re-tags with the position moved one slot towards the head.
    pub(crate) fn shift_down<U: Row>(self) -> Union<U> {
        Union {
            index: self.index - 1,
            operation: self.operation,
            arguments: self.arguments,
            _row: PhantomData,
        }
    }

    /// Recovers the request, once a witness has matched the position.
    pub(crate) fn into_request<E: Effect>(self) -> Request<E> {
        Request::from_parts(self.operation, self.arguments)
    }
}

impl<R: Row> Clone for Union<R> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            operation: self.operation,
            arguments: Rc::clone(&self.arguments),
            _row: PhantomData,
        }
    }
}

impl<R: Row> Debug for Union<R> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Union")
            .field("index", &self.index)
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

/// A non-empty ordered batch of effect invocations.
///
/// This is the payload of an applicative program node: the effects are
/// independent of one another, and the node's zipper consumes their
/// answers in exactly this order.
pub struct Unions<R: Row> {
    head: Union<R>,
    tail: Vec<Union<R>>,
}

impl<R: Row> Unions<R> {
    /// A batch of one.
    #[must_use]
    pub const fn singleton(head: Union<R>) -> Self {
        Self {
            head,
            tail: Vec::new(),
        }
    }

    /// Builds a batch from a head and the remaining invocations.
    #[must_use]
    pub fn new(head: Union<R>, tail: Vec<Union<R>>) -> Self {
        Self { head, tail }
    }

    /// Rebuilds a batch from an ordered, non-empty list.
    ///
    /// # Panics
    ///
    /// Panics if the list is empty; an empty batch is a fatal violation
    /// of the applicative node invariant.
    #[must_use]
    pub fn from_vec(mut unions: Vec<Union<R>>) -> Self {
        assert!(
            !unions.is_empty(),
            "an applicative batch must contain at least one effect"
        );
        let tail = unions.split_off(1);
        let head = unions.pop().expect("length checked above");
        Self { head, tail }
    }

    /// Number of invocations in the batch; always at least one.
    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.tail.len()
    }

    /// Concatenates two batches, preserving the head of `self`.
    #[must_use]
    pub fn append(mut self, other: Self) -> Self {
        self.tail.reserve(other.size());
        self.tail.push(other.head);
        self.tail.extend(other.tail);
        self
    }

    /// Splits the batch into its head and tail.
    #[must_use]
    pub fn into_parts(self) -> (Union<R>, Vec<Union<R>>) {
        (self.head, self.tail)
    }

    /// Maps every invocation into another row, preserving order.
    #[must_use]
    pub fn into_map<U: Row>(self, remap: impl Fn(Union<R>) -> Union<U>) -> Unions<U> {
        Unions {
            head: remap(self.head),
            tail: self.tail.into_iter().map(remap).collect(),
        }
    }

    /// Partitions the batch by a membership witness, removing `E` from
    /// the row of the untargeted remainder.
    #[must_use]
    pub fn project<E, I>(self) -> CollectedUnions<E, R::Out>
    where
        E: Effect,
        R: Member<E, I>,
    {
        let mut collected = CollectedUnions::with_capacity(self.size());
        let entries = std::iter::once(self.head).chain(self.tail);
        for (position, union) in entries.enumerate() {
            match <R as Member<E, I>>::project(union) {
                Ok(request) => collected.push_effect(position, request),
                Err(other) => collected.push_other(position, other),
            }
        }
        collected
    }

    /// Partitions the batch in place: the untargeted remainder keeps
    /// the full row `R`. Used by the `intercept` family.
    #[must_use]
    pub fn extract<E, I>(self) -> CollectedUnions<E, R>
    where
        E: Effect,
        R: MemberInOut<E, I>,
    {
        let mut collected = CollectedUnions::with_capacity(self.size());
        let entries = std::iter::once(self.head).chain(self.tail);
        for (position, union) in entries.enumerate() {
            match <R as MemberInOut<E, I>>::extract(union) {
                Ok(request) => collected.push_effect(position, request),
                Err(other) => collected.push_other(position, other),
            }
        }
        collected
    }
}

impl<R: Row> Clone for Unions<R> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
            tail: self.tail.clone(),
        }
    }
}

impl<R: Row> Debug for Unions<R> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Unions")
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

/// The partition of a batch produced by a membership witness.
///
/// `effects` are the targeted invocations and `others` the remainder,
/// both in their original relative order; `indices` and `other_indices`
/// record the original batch positions so interpreter outputs can be
/// fed back to the zipper in batch order.
pub struct CollectedUnions<E: Effect, U: Row> {
    /// Targeted invocations, in original order.
    pub effects: Vec<Request<E>>,
    /// Untargeted invocations, in original order.
    pub others: Vec<Union<U>>,
    /// Original batch positions of `effects`.
    pub indices: Positions,
    /// Original batch positions of `others`.
    pub other_indices: Positions,
}

impl<E: Effect, U: Row> CollectedUnions<E, U> {
    fn with_capacity(size: usize) -> Self {
        Self {
            effects: Vec::with_capacity(size),
            others: Vec::new(),
            indices: Positions::new(),
            other_indices: Positions::new(),
        }
    }

    fn push_effect(&mut self, position: usize, request: Request<E>) {
        self.effects.push(request);
        self.indices.push(position);
    }

    fn push_other(&mut self, position: usize, union: Union<U>) {
        self.others.push(union);
        self.other_indices.push(position);
    }
}

/// Restores batch order: `answers` land at `indices`, `other_answers`
/// at `other_indices`.
///
/// # Panics
///
/// Panics if the two index lists do not partition the combined length —
/// a fatal violation of the applicative positional contract.
pub(crate) fn reorder(
    answers: Vec<Value>,
    indices: &[usize],
    other_answers: Vec<Value>,
    other_indices: &[usize],
) -> Vec<Value> {
    debug_assert_eq!(
        answers.len(),
        indices.len(),
        "applicative batch arity mismatch on targeted effects"
    );
    debug_assert_eq!(
        other_answers.len(),
        other_indices.len(),
        "applicative batch arity mismatch on remaining effects"
    );
    let mut slots: Vec<Option<Value>> = vec![None; answers.len() + other_answers.len()];
    for (answer, &position) in answers.into_iter().zip(indices) {
        slots[position] = Some(answer);
    }
    for (answer, &position) in other_answers.into_iter().zip(other_indices) {
        slots[position] = Some(answer);
    }
    slots
        .into_iter()
        .map(|slot| slot.expect("every batch position must be filled exactly once"))
        .collect()
}

//! The interpreter kernel.
//!
//! Every handler in this crate is driven by one of two iterative
//! drivers: [`interpret_loop`], which removes an effect from the row,
//! and [`intercept_loop`], which rewrites it in place. Both walk the
//! program in a plain `loop`, so interpretation runs in bounded stack
//! no matter how deep the program is.
//!
//! A driver is parameterized by a [`Loop`]: a handler-private state, a
//! step for finished values, a step for one monadic effect, and a step
//! for an applicative batch. Each step either continues the loop with a
//! rewritten program and a new state, or terminates with the driver's
//! final program.
//!
//! # Foreign effects
//!
//! When the driver meets an effect it does not handle, it stops and
//! rebuilds the node in the output row, wrapping the *rest of the
//! interpretation* in a single lazy arrow. The outer handler that
//! eventually resumes that continuation re-enters the driver; no stack
//! is consumed while handlers interleave.
//!
//! # Batches
//!
//! An applicative node is partitioned by the membership witness. If no
//! invocation matches, the whole batch moves to the output row and the
//! driver chains itself onto its result. Otherwise the handler receives
//! the matching requests together with a [`BatchContinuation`] that
//! restores answer positions, rebuilds the remaining batch, and resumes
//! the program.

use std::marker::PhantomData;

use crate::arrs::Arrs;
use crate::eff::{Eff, EffInner, Zipper};
use crate::effect::{Effect, Request, Value};
use crate::member::{Member, MemberInOut};
use crate::row::Row;
use crate::union::{reorder, Positions, Union, Unions};

/// The outcome of one handler step: keep driving a rewritten program,
/// or finish with the driver's result.
pub enum Step<R: Row, A: 'static, S, T> {
    /// Continue the loop on this program with this state.
    Continue(Eff<R, A>, S),
    /// Terminate the driver with this result.
    Done(T),
}

/// The resumable continuation of one monadic effect.
///
/// Resuming applies the program's remaining arrows to the effect's
/// answer. A continuation may be resumed any number of times; each
/// resumption replays the arrows on the given answer.
pub struct Continuation<R: Row, A: 'static> {
    queue: Arrs<R>,
    _result: PhantomData<fn() -> A>,
}

impl<R: Row, A: 'static> Continuation<R, A> {
    pub(crate) const fn new(queue: Arrs<R>) -> Self {
        Self {
            queue,
            _result: PhantomData,
        }
    }

    /// Resumes the program with a typed answer.
    ///
    /// # Panics
    ///
    /// Panics (fatally) if `X` is not the answer type the program
    /// expects at this point.
    #[must_use]
    pub fn resume<X: 'static>(&self, answer: X) -> Eff<R, A>
    where
        A: Clone,
    {
        self.resume_erased(crate::effect::value(answer))
    }

    /// Resumes the program with an already-erased answer.
    #[must_use]
    pub fn resume_erased(&self, answer: Value) -> Eff<R, A>
    where
        A: Clone,
    {
        Eff::from_erased(self.queue.apply_erased(answer))
    }

    /// The underlying arrow deque.
    #[must_use]
    pub fn into_arrs(self) -> Arrs<R> {
        self.queue
    }
}

impl<R: Row, A: 'static> Clone for Continuation<R, A> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            _result: PhantomData,
        }
    }
}

/// The resumable continuation of an applicative batch.
///
/// Holds the untargeted remainder of the batch and the positional
/// bookkeeping needed to feed the zipper in original batch order.
pub struct BatchContinuation<R: Row, A: 'static> {
    others: Vec<Union<R>>,
    indices: Positions,
    other_indices: Positions,
    zipper: Zipper,
    _result: PhantomData<fn() -> A>,
}

impl<R: Row, A: 'static> BatchContinuation<R, A> {
    pub(crate) const fn new(
        others: Vec<Union<R>>,
        indices: Positions,
        other_indices: Positions,
        zipper: Zipper,
    ) -> Self {
        Self {
            others,
            indices,
            other_indices,
            zipper,
            _result: PhantomData,
        }
    }

    /// Number of answers a resumption expects.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.indices.len()
    }

    /// Resumes with one erased answer per targeted invocation, in the
    /// order the requests were presented.
    ///
    /// If untargeted invocations remain, the result is a smaller batch
    /// over them whose zipper merges both answer sets back into the
    /// original positions.
    ///
    /// # Panics
    ///
    /// Panics (fatally) if the number of answers differs from
    /// [`arity`](Self::arity).
    #[must_use]
    pub fn resume(&self, answers: Vec<Value>) -> Eff<R, A>
    where
        A: Clone,
    {
        assert_eq!(
            answers.len(),
            self.arity(),
            "applicative handler answered {} of {} batched effects",
            answers.len(),
            self.arity(),
        );
        if self.others.is_empty() {
            let ordered = reorder(answers, &self.indices, Vec::new(), &[]);
            Eff::pure(crate::effect::claim::<A>((self.zipper)(ordered)))
        } else {
            let unions = Unions::from_vec(self.others.clone());
            let indices = self.indices.clone();
            let other_indices = self.other_indices.clone();
            let zipper = std::rc::Rc::clone(&self.zipper);
            let combined = move |other_answers: Vec<Value>| {
                zipper(reorder(
                    answers.clone(),
                    &indices,
                    other_answers,
                    &other_indices,
                ))
            };
            Eff::from_inner(EffInner::ImpureAp {
                unions,
                zipper: std::rc::Rc::new(combined),
                _result: PhantomData,
            })
        }
    }

    /// Resumes with one typed answer per targeted invocation.
    #[must_use]
    pub fn resume_typed<X: 'static>(&self, answers: Vec<X>) -> Eff<R, A>
    where
        A: Clone,
    {
        self.resume(answers.into_iter().map(crate::effect::value).collect())
    }
}

impl<R: Row, A: 'static> Clone for BatchContinuation<R, A> {
    fn clone(&self) -> Self {
        Self {
            others: self.others.clone(),
            indices: self.indices.clone(),
            other_indices: self.other_indices.clone(),
            zipper: std::rc::Rc::clone(&self.zipper),
            _result: PhantomData,
        }
    }
}

/// The fully general handler protocol: private state plus one step per
/// program node.
///
/// `R` is the row being interpreted, `U` the output row, `B` the
/// output value type; every step returns either a rewritten program in
/// `R` to keep driving, or the final `Eff<U, B>`.
pub trait Loop<E: Effect, R: Row, A: 'static, U: Row, B: 'static> {
    /// Handler-private state threaded through the drive.
    type State;

    /// A finished value reached the handler.
    fn on_pure(&mut self, value: A, state: Self::State) -> Step<R, A, Self::State, Eff<U, B>>;

    /// One matching monadic effect and its continuation.
    fn on_effect(
        &mut self,
        request: Request<E>,
        continuation: Continuation<R, A>,
        state: Self::State,
    ) -> Step<R, A, Self::State, Eff<U, B>>;

    /// The matching part of an applicative batch, with the continuation
    /// that restores positions and resumes the program.
    fn on_applicative(
        &mut self,
        requests: Vec<Request<E>>,
        continuation: BatchContinuation<R, A>,
        state: Self::State,
    ) -> Step<R, A, Self::State, Eff<U, B>>;
}

/// A [`Loop`] without private state.
pub trait StatelessLoop<E: Effect, R: Row, A: 'static, U: Row, B: 'static> {
    /// A finished value reached the handler.
    fn on_pure(&mut self, value: A) -> StatelessStep<R, A, Eff<U, B>>;

    /// One matching monadic effect and its continuation.
    fn on_effect(
        &mut self,
        request: Request<E>,
        continuation: Continuation<R, A>,
    ) -> StatelessStep<R, A, Eff<U, B>>;

    /// The matching part of an applicative batch.
    fn on_applicative(
        &mut self,
        requests: Vec<Request<E>>,
        continuation: BatchContinuation<R, A>,
    ) -> StatelessStep<R, A, Eff<U, B>>;
}

/// The outcome of one stateless handler step.
pub enum StatelessStep<R: Row, A: 'static, T> {
    /// Continue the loop on this program.
    Continue(Eff<R, A>),
    /// Terminate the driver with this result.
    Done(T),
}

/// Adapts a [`StatelessLoop`] to the stateful protocol.
#[derive(Clone)]
struct StatelessAdapter<L>(L);

impl<E, R, A, U, B, L> Loop<E, R, A, U, B> for StatelessAdapter<L>
where
    E: Effect,
    R: Row,
    U: Row,
    A: 'static,
    B: 'static,
    L: StatelessLoop<E, R, A, U, B>,
{
    type State = ();

    fn on_pure(&mut self, value: A, (): ()) -> Step<R, A, (), Eff<U, B>> {
        match self.0.on_pure(value) {
            StatelessStep::Continue(program) => Step::Continue(program, ()),
            StatelessStep::Done(result) => Step::Done(result),
        }
    }

    fn on_effect(
        &mut self,
        request: Request<E>,
        continuation: Continuation<R, A>,
        (): (),
    ) -> Step<R, A, (), Eff<U, B>> {
        match self.0.on_effect(request, continuation) {
            StatelessStep::Continue(program) => Step::Continue(program, ()),
            StatelessStep::Done(result) => Step::Done(result),
        }
    }

    fn on_applicative(
        &mut self,
        requests: Vec<Request<E>>,
        continuation: BatchContinuation<R, A>,
        (): (),
    ) -> Step<R, A, (), Eff<U, B>> {
        match self.0.on_applicative(requests, continuation) {
            StatelessStep::Continue(program) => Step::Continue(program, ()),
            StatelessStep::Done(result) => Step::Done(result),
        }
    }
}

/// Drives a handler over a program, removing effect `E` from the row.
///
/// The driver loops over the program: finished values go to
/// [`Loop::on_pure`]; matching effects to [`Loop::on_effect`] /
/// [`Loop::on_applicative`]; a foreign effect stops the loop and the
/// rest of the interpretation is wrapped lazily into its continuation.
pub fn interpret_loop<E, I, R, U, A, B, L>(
    effect: Eff<R, A>,
    mut handler: L,
    initial: L::State,
) -> Eff<U, B>
where
    E: Effect,
    I: 'static,
    R: Member<E, I, Out = U>,
    U: Row,
    A: Clone + 'static,
    B: 'static,
    L: Loop<E, R, A, U, B> + Clone + 'static,
    L::State: Clone + 'static,
{
    let mut current = effect;
    let mut state = initial;
    loop {
        let step = match current.into_inner() {
            EffInner::Pure(finished) => handler.on_pure(finished, state),
            EffInner::Impure { union, queue, .. } => match <R as Member<E, I>>::project(union) {
                Ok(request) => handler.on_effect(request, Continuation::new(queue), state),
                Err(outside) => {
                    let resume = move |answer: Value| -> Eff<U, Value> {
                        interpret_loop::<E, I, R, U, A, B, L>(
                            Eff::from_erased(queue.apply_erased(answer)),
                            handler.clone(),
                            state.clone(),
                        )
                        .erase()
                    };
                    return Eff::impure(outside, Arrs::singleton_raw(resume));
                }
            },
            EffInner::ImpureAp { unions, zipper, .. } => {
                let collected = unions.project::<E, I>();
                if collected.effects.is_empty() {
                    let rebuilt: Eff<U, A> = Eff::from_inner(EffInner::ImpureAp {
                        unions: Unions::from_vec(collected.others),
                        zipper,
                        _result: PhantomData,
                    });
                    return rebuilt.flat_map(move |finished: A| {
                        interpret_loop::<E, I, R, U, A, B, L>(
                            Eff::pure(finished),
                            handler.clone(),
                            state.clone(),
                        )
                    });
                }
                let continuation = BatchContinuation::new(
                    collected
                        .others
                        .into_iter()
                        .map(<R as Member<E, I>>::accept)
                        .collect(),
                    collected.indices,
                    collected.other_indices,
                    zipper,
                );
                handler.on_applicative(collected.effects, continuation, state)
            }
        };
        match step {
            Step::Continue(next, next_state) => {
                current = next;
                state = next_state;
            }
            Step::Done(result) => return result,
        }
    }
}

/// [`interpret_loop`] for handlers without private state.
pub fn interpret_stateless_loop<E, I, R, U, A, B, L>(effect: Eff<R, A>, handler: L) -> Eff<U, B>
where
    E: Effect,
    I: 'static,
    R: Member<E, I, Out = U>,
    U: Row,
    A: Clone + 'static,
    B: 'static,
    L: StatelessLoop<E, R, A, U, B> + Clone + 'static,
{
    interpret_loop::<E, I, R, U, A, B, _>(effect, StatelessAdapter(handler), ())
}

/// Drives a handler over a program, leaving the row unchanged.
///
/// The in-place twin of [`interpret_loop`]: effects are matched with
/// the weaker witness, non-matching nodes are passed through verbatim,
/// and rewritten programs stay in `R`.
pub fn intercept_loop<E, I, R, A, B, L>(
    effect: Eff<R, A>,
    mut handler: L,
    initial: L::State,
) -> Eff<R, B>
where
    E: Effect,
    I: 'static,
    R: MemberInOut<E, I>,
    A: Clone + 'static,
    B: 'static,
    L: Loop<E, R, A, R, B> + Clone + 'static,
    L::State: Clone + 'static,
{
    let mut current = effect;
    let mut state = initial;
    loop {
        let step = match current.into_inner() {
            EffInner::Pure(finished) => handler.on_pure(finished, state),
            EffInner::Impure { union, queue, .. } => {
                match <R as MemberInOut<E, I>>::extract(union) {
                    Ok(request) => handler.on_effect(request, Continuation::new(queue), state),
                    Err(unchanged) => {
                        let resume = move |answer: Value| -> Eff<R, Value> {
                            intercept_loop::<E, I, R, A, B, L>(
                                Eff::from_erased(queue.apply_erased(answer)),
                                handler.clone(),
                                state.clone(),
                            )
                            .erase()
                        };
                        return Eff::impure(unchanged, Arrs::singleton_raw(resume));
                    }
                }
            }
            EffInner::ImpureAp { unions, zipper, .. } => {
                let collected = unions.extract::<E, I>();
                if collected.effects.is_empty() {
                    let rebuilt: Eff<R, A> = Eff::from_inner(EffInner::ImpureAp {
                        unions: Unions::from_vec(collected.others),
                        zipper,
                        _result: PhantomData,
                    });
                    return rebuilt.flat_map(move |finished: A| {
                        intercept_loop::<E, I, R, A, B, L>(
                            Eff::pure(finished),
                            handler.clone(),
                            state.clone(),
                        )
                    });
                }
                let continuation = BatchContinuation::new(
                    collected.others,
                    collected.indices,
                    collected.other_indices,
                    zipper,
                );
                handler.on_applicative(collected.effects, continuation, state)
            }
        };
        match step {
            Step::Continue(next, next_state) => {
                current = next;
                state = next_state;
            }
            Step::Done(result) => return result,
        }
    }
}

/// [`intercept_loop`] for handlers without private state.
pub fn intercept_stateless_loop<E, I, R, A, B, L>(effect: Eff<R, A>, handler: L) -> Eff<R, B>
where
    E: Effect,
    I: 'static,
    R: MemberInOut<E, I>,
    A: Clone + 'static,
    B: 'static,
    L: StatelessLoop<E, R, A, R, B> + Clone + 'static,
{
    intercept_loop::<E, I, R, A, B, _>(effect, StatelessAdapter(handler), ())
}

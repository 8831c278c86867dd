//! The handler toolbox: combinators for writing interpreters.
//!
//! Most effect modules never touch the kernel directly; they implement
//! one of the small extension traits here and hand it to the matching
//! combinator:
//!
//! | Combinator | Extension point | Row |
//! |---|---|---|
//! | [`interpret`] | [`Recurse`] | removes the effect |
//! | [`interpret_state`] | [`StateRecurse`] | removes the effect |
//! | [`run_fold`] | [`LeftFold`] | removes the effect |
//! | [`intercept`] | [`Recurse`] | unchanged |
//! | [`transform`] | [`NaturalTransformation`] | swaps one effect |
//! | [`translate`] | [`Translate`] | replaces one effect by a program |
//! | [`translate_nat`] | [`NaturalTransformation`] | replaces one effect by another |
//! | [`interpret_unsafe`] | [`SideEffect`] | removes the effect |
//!
//! Handlers answer requests with erased [`Value`]s; answering with the
//! wrong type is a fatal programmer error caught at the continuation
//! boundary. A handler that answers an applicative batch must produce
//! exactly one answer per request, in presentation order.

use std::marker::PhantomData;
use std::rc::Rc;

use crate::arrs::Arrs;
use crate::eff::{send, sequence_erased, Eff, EffInner};
use crate::effect::{claim, Effect, Request, Value};
use crate::interpret::{
    intercept_loop, interpret_loop, BatchContinuation, Continuation, Loop, Step,
};
use crate::member::{Member, MemberInOut};
use crate::row::Row;
use crate::union::{reorder, Unions};

/// The decision of a stateless handler for an applicative batch.
pub enum Batched<E: Effect> {
    /// One answer per request, in presentation order; the batch
    /// continues applicatively.
    Answers(Vec<Value>),
    /// A single compressed request standing for the whole batch. The
    /// driver re-sends it monadically; its answer must claim to a
    /// `Vec<Value>` with one entry per original request.
    Compressed(Request<E>),
}

/// The decision of a stateful handler for an applicative batch.
pub enum BatchedState<E: Effect, S> {
    /// One answer per request plus the state after the batch.
    Answers(Vec<Value>, S),
    /// A compressed request (see [`Batched::Compressed`]) plus the
    /// state to resume with.
    Compressed(Request<E>, S),
}

/// A stateless interpreter step: answer a request and continue, or
/// short-circuit with a finished program.
pub trait Recurse<E: Effect, U: Row, B: 'static> {
    /// Handles one request.
    ///
    /// # Errors
    ///
    /// The `Err` branch short-circuits: the returned program replaces
    /// the rest of the computation.
    fn apply(&mut self, request: Request<E>) -> Result<Value, Eff<U, B>>;

    /// Handles an applicative batch.
    fn applicative(&mut self, requests: Vec<Request<E>>) -> Batched<E>;
}

/// A stateful interpreter step threading a private state left to
/// right.
pub trait StateRecurse<E: Effect, A: 'static, B: 'static> {
    /// The threaded state.
    type State;

    /// The state before the first request.
    fn init(&mut self) -> Self::State;

    /// Handles one request, producing its answer and the next state.
    fn apply(&mut self, request: Request<E>, state: Self::State) -> (Value, Self::State);

    /// Handles an applicative batch. The default threads the state
    /// through the requests in presentation order.
    fn applicative(
        &mut self,
        requests: Vec<Request<E>>,
        state: Self::State,
    ) -> BatchedState<E, Self::State> {
        let mut answers = Vec::with_capacity(requests.len());
        let mut state = state;
        for request in requests {
            let (answer, next) = self.apply(request, state);
            answers.push(answer);
            state = next;
        }
        BatchedState::Answers(answers, state)
    }

    /// Combines the finished value with the final state.
    fn finalize(&mut self, value: A, state: Self::State) -> B;
}

/// An accumulating interpreter: fold every request into a state, then
/// combine it with the result. The shape writer-like modules use.
pub trait LeftFold<E: Effect, A: 'static, B: 'static> {
    /// The accumulator.
    type State;

    /// The empty accumulator.
    fn init(&mut self) -> Self::State;

    /// Folds one request into the accumulator, answering it.
    fn fold(&mut self, state: Self::State, request: Request<E>) -> (Value, Self::State);

    /// Combines the finished value with the accumulator.
    fn finalize(&mut self, value: A, state: Self::State) -> B;
}

/// Swaps one effect for another, request by request.
pub trait NaturalTransformation<T: Effect, V: Effect> {
    /// Translates one request.
    fn apply(&mut self, request: Request<T>) -> Request<V>;
}

/// Replaces one effect by a whole program in the smaller row.
pub trait Translate<T: Effect, U: Row> {
    /// The program whose result answers the request.
    fn apply(&mut self, request: Request<T>) -> Eff<U, Value>;
}

/// Executes requests immediately for their side effects.
///
/// The escape hatch for modules that really do I/O: the interpreter
/// treats the module's `T -> X` as a pure function.
pub trait SideEffect<E: Effect> {
    /// Performs one request, returning its answer.
    fn apply(&mut self, request: Request<E>) -> Value;

    /// Performs a batch; the default runs requests in presentation
    /// order.
    fn apply_batch(&mut self, requests: Vec<Request<E>>) -> Vec<Value> {
        requests
            .into_iter()
            .map(|request| self.apply(request))
            .collect()
    }
}

/// Rebuilds a compressed batch as a monadic effect whose answer feeds
/// the batch continuation.
fn compressed_program<R, A>(
    union: crate::union::Union<R>,
    continuation: BatchContinuation<R, A>,
) -> Eff<R, A>
where
    R: Row,
    A: Clone + 'static,
{
    let resume = move |payload: Value| {
        let answers = claim::<Vec<Value>>(payload);
        continuation.resume(answers).erase()
    };
    Eff::impure(union, Arrs::singleton_raw(resume))
}

struct InterpretAdapter<P, K, I> {
    pure: P,
    recurse: K,
    _index: PhantomData<fn() -> I>,
}

impl<P: Clone, K: Clone, I> Clone for InterpretAdapter<P, K, I> {
    fn clone(&self) -> Self {
        Self {
            pure: self.pure.clone(),
            recurse: self.recurse.clone(),
            _index: PhantomData,
        }
    }
}

impl<E, I, R, U, A, B, P, K> Loop<E, R, A, U, B> for InterpretAdapter<P, K, I>
where
    E: Effect,
    I: 'static,
    R: Member<E, I, Out = U>,
    U: Row,
    A: Clone + 'static,
    B: 'static,
    P: Fn(A) -> B,
    K: Recurse<E, U, B>,
{
    type State = ();

    fn on_pure(&mut self, value: A, (): ()) -> Step<R, A, (), Eff<U, B>> {
        Step::Done(Eff::pure((self.pure)(value)))
    }

    fn on_effect(
        &mut self,
        request: Request<E>,
        continuation: Continuation<R, A>,
        (): (),
    ) -> Step<R, A, (), Eff<U, B>> {
        match self.recurse.apply(request) {
            Ok(answer) => Step::Continue(continuation.resume_erased(answer), ()),
            Err(shortcut) => Step::Done(shortcut),
        }
    }

    fn on_applicative(
        &mut self,
        requests: Vec<Request<E>>,
        continuation: BatchContinuation<R, A>,
        (): (),
    ) -> Step<R, A, (), Eff<U, B>> {
        match self.recurse.applicative(requests) {
            Batched::Answers(answers) => Step::Continue(continuation.resume(answers), ()),
            Batched::Compressed(request) => {
                let union = <R as Member<E, I>>::inject(request);
                Step::Continue(compressed_program(union, continuation), ())
            }
        }
    }
}

/// Interprets one effect with a stateless handler, removing it from
/// the row.
///
/// `pure` maps the finished value into the handler's output; `recurse`
/// answers requests one at a time (or per batch) and may
/// short-circuit.
///
/// # Examples
///
/// ```rust
/// use effrow::prelude::*;
/// use effrow::effects::reader::{ask, run_reader, ReaderEffect};
///
/// type App = Fx![ReaderEffect<i32>];
///
/// let program: Eff<App, i32> = ask().map(|env: i32| env * 2);
/// assert_eq!(run(run_reader(program, 21)), 42);
/// ```
pub fn interpret<E, I, R, U, A, B, P, K>(effect: Eff<R, A>, pure: P, recurse: K) -> Eff<U, B>
where
    E: Effect,
    I: 'static,
    R: Member<E, I, Out = U>,
    U: Row,
    A: Clone + 'static,
    B: 'static,
    P: Fn(A) -> B + Clone + 'static,
    K: Recurse<E, U, B> + Clone + 'static,
{
    interpret_loop::<E, I, R, U, A, B, _>(
        effect,
        InterpretAdapter {
            pure,
            recurse,
            _index: PhantomData,
        },
        (),
    )
}

struct StateAdapter<K, I> {
    recurse: K,
    _index: PhantomData<fn() -> I>,
}

impl<K: Clone, I> Clone for StateAdapter<K, I> {
    fn clone(&self) -> Self {
        Self {
            recurse: self.recurse.clone(),
            _index: PhantomData,
        }
    }
}

impl<E, I, R, U, A, B, K> Loop<E, R, A, U, B> for StateAdapter<K, I>
where
    E: Effect,
    I: 'static,
    R: Member<E, I, Out = U>,
    U: Row,
    A: Clone + 'static,
    B: 'static,
    K: StateRecurse<E, A, B>,
{
    type State = K::State;

    fn on_pure(&mut self, value: A, state: K::State) -> Step<R, A, K::State, Eff<U, B>> {
        Step::Done(Eff::pure(self.recurse.finalize(value, state)))
    }

    fn on_effect(
        &mut self,
        request: Request<E>,
        continuation: Continuation<R, A>,
        state: K::State,
    ) -> Step<R, A, K::State, Eff<U, B>> {
        let (answer, next) = self.recurse.apply(request, state);
        Step::Continue(continuation.resume_erased(answer), next)
    }

    fn on_applicative(
        &mut self,
        requests: Vec<Request<E>>,
        continuation: BatchContinuation<R, A>,
        state: K::State,
    ) -> Step<R, A, K::State, Eff<U, B>> {
        match self.recurse.applicative(requests, state) {
            BatchedState::Answers(answers, next) => {
                Step::Continue(continuation.resume(answers), next)
            }
            BatchedState::Compressed(request, next) => {
                let union = <R as Member<E, I>>::inject(request);
                Step::Continue(compressed_program(union, continuation), next)
            }
        }
    }
}

/// Interprets one effect with a state-threading handler, removing it
/// from the row.
pub fn interpret_state<E, I, R, U, A, B, K>(effect: Eff<R, A>, mut recurse: K) -> Eff<U, B>
where
    E: Effect,
    I: 'static,
    R: Member<E, I, Out = U>,
    U: Row,
    A: Clone + 'static,
    B: 'static,
    K: StateRecurse<E, A, B> + Clone + 'static,
    K::State: Clone + 'static,
{
    let initial = recurse.init();
    interpret_loop::<E, I, R, U, A, B, _>(
        effect,
        StateAdapter {
            recurse,
            _index: PhantomData,
        },
        initial,
    )
}

#[derive(Clone)]
struct FoldRecurse<F>(F);

impl<E, A, B, F> StateRecurse<E, A, B> for FoldRecurse<F>
where
    E: Effect,
    A: 'static,
    B: 'static,
    F: LeftFold<E, A, B>,
{
    type State = F::State;

    fn init(&mut self) -> F::State {
        self.0.init()
    }

    fn apply(&mut self, request: Request<E>, state: F::State) -> (Value, F::State) {
        self.0.fold(state, request)
    }

    fn finalize(&mut self, value: A, state: F::State) -> B {
        self.0.finalize(value, state)
    }
}

/// Interprets an accumulating effect, removing it from the row.
pub fn run_fold<E, I, R, U, A, B, F>(effect: Eff<R, A>, fold: F) -> Eff<U, B>
where
    E: Effect,
    I: 'static,
    R: Member<E, I, Out = U>,
    U: Row,
    A: Clone + 'static,
    B: 'static,
    F: LeftFold<E, A, B> + Clone + 'static,
    F::State: Clone + 'static,
{
    interpret_state::<E, I, R, U, A, B, _>(effect, FoldRecurse(fold))
}

struct InterceptAdapter<P, K, I> {
    pure: P,
    recurse: K,
    _index: PhantomData<fn() -> I>,
}

impl<P: Clone, K: Clone, I> Clone for InterceptAdapter<P, K, I> {
    fn clone(&self) -> Self {
        Self {
            pure: self.pure.clone(),
            recurse: self.recurse.clone(),
            _index: PhantomData,
        }
    }
}

impl<E, I, R, A, B, P, K> Loop<E, R, A, R, B> for InterceptAdapter<P, K, I>
where
    E: Effect,
    I: 'static,
    R: MemberInOut<E, I>,
    A: Clone + 'static,
    B: 'static,
    P: Fn(A) -> B,
    K: Recurse<E, R, B>,
{
    type State = ();

    fn on_pure(&mut self, value: A, (): ()) -> Step<R, A, (), Eff<R, B>> {
        Step::Done(Eff::pure((self.pure)(value)))
    }

    fn on_effect(
        &mut self,
        request: Request<E>,
        continuation: Continuation<R, A>,
        (): (),
    ) -> Step<R, A, (), Eff<R, B>> {
        match self.recurse.apply(request) {
            Ok(answer) => Step::Continue(continuation.resume_erased(answer), ()),
            Err(shortcut) => Step::Done(shortcut),
        }
    }

    fn on_applicative(
        &mut self,
        requests: Vec<Request<E>>,
        continuation: BatchContinuation<R, A>,
        (): (),
    ) -> Step<R, A, (), Eff<R, B>> {
        match self.recurse.applicative(requests) {
            Batched::Answers(answers) => Step::Continue(continuation.resume(answers), ()),
            Batched::Compressed(request) => {
                let union = <R as MemberInOut<E, I>>::inject(request);
                Step::Continue(compressed_program(union, continuation), ())
            }
        }
    }
}

/// Interprets one effect in place: the effect stays in the row and the
/// rewritten program remains in `R`.
///
/// The in-place mirror of [`interpret`]; error-recovery combinators
/// are its typical use.
pub fn intercept<E, I, R, A, B, P, K>(effect: Eff<R, A>, pure: P, recurse: K) -> Eff<R, B>
where
    E: Effect,
    I: 'static,
    R: MemberInOut<E, I>,
    A: Clone + 'static,
    B: 'static,
    P: Fn(A) -> B + Clone + 'static,
    K: Recurse<E, R, B> + Clone + 'static,
{
    intercept_loop::<E, I, R, A, B, _>(
        effect,
        InterceptAdapter {
            pure,
            recurse,
            _index: PhantomData,
        },
        (),
    )
}

/// Swaps effect `T` for effect `V` in the row, leaving everything else
/// untouched.
///
/// Applicative nodes are normalized to their monadic form before the
/// swap, so a batch containing a `T` is translated one invocation at a
/// time.
pub fn transform<T, V, I, J, R, U, A, N>(effect: Eff<R, A>, nat: N) -> Eff<U, A>
where
    T: Effect,
    V: Effect,
    I: 'static,
    J: 'static,
    R: Member<T, I>,
    U: Member<V, J, Out = <R as Member<T, I>>::Out>,
    A: Clone + 'static,
    N: NaturalTransformation<T, V> + Clone + 'static,
{
    Eff::from_erased(transform_go::<T, V, I, J, R, U, N>(effect.erase(), nat))
}

fn transform_go<T, V, I, J, R, U, N>(effect: Eff<R, Value>, mut nat: N) -> Eff<U, Value>
where
    T: Effect,
    V: Effect,
    I: 'static,
    J: 'static,
    R: Member<T, I>,
    U: Member<V, J, Out = <R as Member<T, I>>::Out>,
    N: NaturalTransformation<T, V> + Clone + 'static,
{
    let mut current = effect;
    loop {
        match current.into_inner() {
            EffInner::Pure(payload) => return Eff::pure(payload),
            EffInner::Impure { union, queue, .. } => {
                return match <R as Member<T, I>>::project(union) {
                    Ok(request) => {
                        let translated = nat.apply(request);
                        let continuation = Arrs::singleton_raw(move |answer: Value| {
                            transform_go::<T, V, I, J, R, U, N>(
                                queue.apply_erased(answer),
                                nat.clone(),
                            )
                        });
                        Eff::impure(<U as Member<V, J>>::inject(translated), continuation)
                    }
                    Err(outside) => {
                        let continuation = Arrs::singleton_raw(move |answer: Value| {
                            transform_go::<T, V, I, J, R, U, N>(
                                queue.apply_erased(answer),
                                nat.clone(),
                            )
                        });
                        Eff::impure(<U as Member<V, J>>::accept(outside), continuation)
                    }
                };
            }
            EffInner::ImpureAp { unions, zipper, .. } => {
                current = Eff::monadic(unions, zipper);
            }
        }
    }
}

/// Replaces effect `T` by a program in the remaining row, inlining it.
///
/// Batched `T` invocations are translated independently and recombined
/// applicatively, so interpreters downstream still see them as one
/// batch.
pub fn translate<T, I, R, U, A, TR>(effect: Eff<R, A>, translator: TR) -> Eff<U, A>
where
    T: Effect,
    I: 'static,
    R: Member<T, I, Out = U>,
    U: Row,
    A: Clone + 'static,
    TR: Translate<T, U> + Clone + 'static,
{
    Eff::from_erased(translate_go::<T, I, R, U, TR>(effect.erase(), translator))
}

fn translate_go<T, I, R, U, TR>(effect: Eff<R, Value>, mut translator: TR) -> Eff<U, Value>
where
    T: Effect,
    I: 'static,
    R: Member<T, I, Out = U>,
    U: Row,
    TR: Translate<T, U> + Clone + 'static,
{
    match effect.into_inner() {
        EffInner::Pure(payload) => Eff::pure(payload),
        EffInner::Impure { union, queue, .. } => match <R as Member<T, I>>::project(union) {
            Ok(request) => {
                let program = translator.apply(request);
                program.flat_map_erased(move |answer: Value| {
                    translate_go::<T, I, R, U, TR>(queue.apply_erased(answer), translator.clone())
                })
            }
            Err(outside) => Eff::impure(
                outside,
                Arrs::singleton_raw(move |answer: Value| {
                    translate_go::<T, I, R, U, TR>(queue.apply_erased(answer), translator.clone())
                }),
            ),
        },
        EffInner::ImpureAp { unions, zipper, .. } => {
            let collected = unions.project::<T, I>();
            if collected.effects.is_empty() {
                return Eff::from_inner(EffInner::ImpureAp {
                    unions: Unions::from_vec(collected.others),
                    zipper,
                    _result: PhantomData,
                });
            }
            let programs: Vec<Eff<U, Value>> = collected
                .effects
                .into_iter()
                .map(|request| translator.apply(request))
                .collect();
            let others = collected.others;
            let indices = collected.indices;
            let other_indices = collected.other_indices;
            sequence_erased(programs).flat_map(move |answers: Vec<Value>| -> Eff<U, Value> {
                if others.is_empty() {
                    Eff::pure(zipper(reorder(answers, &indices, Vec::new(), &[])))
                } else {
                    let unions = Unions::from_vec(others.clone());
                    let zip = Rc::clone(&zipper);
                    let targeted = indices.clone();
                    let remaining = other_indices.clone();
                    let combined = move |other_answers: Vec<Value>| {
                        zip(reorder(
                            answers.clone(),
                            &targeted,
                            other_answers,
                            &remaining,
                        ))
                    };
                    Eff::from_inner(EffInner::ImpureAp {
                        unions,
                        zipper: Rc::new(combined),
                        _result: PhantomData,
                    })
                }
            })
        }
    }
}

struct NatTranslator<N, V, J> {
    nat: N,
    _marker: PhantomData<fn() -> (V, J)>,
}

impl<N: Clone, V, J> Clone for NatTranslator<N, V, J> {
    fn clone(&self) -> Self {
        Self {
            nat: self.nat.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, V, J, U, N> Translate<T, U> for NatTranslator<N, V, J>
where
    T: Effect,
    V: Effect,
    J: 'static,
    U: Member<V, J>,
    N: NaturalTransformation<T, V>,
{
    fn apply(&mut self, request: Request<T>) -> Eff<U, Value> {
        send::<V, U, J, Value>(self.nat.apply(request))
    }
}

/// Replaces effect `T` by effect `V` already present in the remaining
/// row, request by request.
pub fn translate_nat<T, V, I, J, R, U, A, N>(effect: Eff<R, A>, nat: N) -> Eff<U, A>
where
    T: Effect,
    V: Effect,
    I: 'static,
    J: 'static,
    R: Member<T, I, Out = U>,
    U: Member<V, J>,
    A: Clone + 'static,
    N: NaturalTransformation<T, V> + Clone + 'static,
{
    translate::<T, I, R, U, A, _>(
        effect,
        NatTranslator {
            nat,
            _marker: PhantomData,
        },
    )
}

#[derive(Clone)]
struct SideEffectRecurse<SE>(SE);

impl<E, U, B, SE> Recurse<E, U, B> for SideEffectRecurse<SE>
where
    E: Effect,
    U: Row,
    B: 'static,
    SE: SideEffect<E>,
{
    fn apply(&mut self, request: Request<E>) -> Result<Value, Eff<U, B>> {
        Ok(self.0.apply(request))
    }

    fn applicative(&mut self, requests: Vec<Request<E>>) -> Batched<E> {
        Batched::Answers(self.0.apply_batch(requests))
    }
}

/// Interprets one effect by executing its requests immediately,
/// removing it from the row.
pub fn interpret_unsafe<E, I, R, U, A, SE>(effect: Eff<R, A>, side_effect: SE) -> Eff<U, A>
where
    E: Effect,
    I: 'static,
    R: Member<E, I, Out = U>,
    U: Row,
    A: Clone + 'static,
    SE: SideEffect<E> + Clone + 'static,
{
    interpret::<E, I, R, U, A, A, _, _>(effect, |value: A| value, SideEffectRecurse(side_effect))
}

//! The effectful program type.
//!
//! An [`Eff<R, A>`] describes a computation that may invoke effects
//! from the row `R` and produces an `A`. Nothing happens when the value
//! is built; handlers later peel effects off the row one at a time
//! until [`run`](crate::runner::run) can extract the result.
//!
//! A program is one of three nodes:
//!
//! - `Pure` — a finished value;
//! - `Impure` — one effect invocation plus its continuation, a
//!   [`Arrs`] deque of Kleisli arrows;
//! - `ImpureAp` — an ordered batch of *independent* invocations plus a
//!   zipper that combines their answers. Batches are what let an
//!   interpreter see independent effects together instead of one at a
//!   time.
//!
//! # Stack safety
//!
//! `flat_map` appends to the continuation deque in O(1); interpretation
//! walks deques iteratively. Deep chains (millions of binds) neither
//! build call stacks when constructed nor when run.
//!
//! # The applicative positional contract
//!
//! The zipper of an `ImpureAp` node is applied to exactly one answer
//! per batched invocation, in batch order. The interpreter machinery
//! re-sorts partial results to maintain this; a handler that answers a
//! batch with the wrong arity trips a fatal assertion.
//!
//! # Examples
//!
//! ```rust
//! use effrow::prelude::*;
//! use effrow::effects::state::{get, put, run_state, StateEffect};
//!
//! type App = Fx![StateEffect<i32>];
//!
//! let program: Eff<App, i32> = get().flat_map(|x: i32| put(x + 1)).then(get());
//! let (result, state) = run(run_state(program, 41));
//! assert_eq!((result, state), (42, 42));
//! ```

use std::marker::PhantomData;
use std::rc::Rc;

use crate::arrs::Arrs;
use crate::effect::{claim, value, Effect, Request, Value};
use crate::member::Member;
use crate::row::Row;
use crate::union::{Union, Unions};

/// The zipper of an applicative node: combines the erased answers of a
/// batch, in batch order, into the node's (erased) result.
pub(crate) type Zipper = Rc<dyn Fn(Vec<Value>) -> Value>;

/// Internal representation of a program.
///
/// On the impure variants the result type is phantom: the queue (or
/// zipper) produces an erased payload that holds an `A` by
/// construction.
pub(crate) enum EffInner<R: Row, A: 'static> {
    Pure(A),
    Impure {
        union: Union<R>,
        queue: Arrs<R>,
        _result: PhantomData<fn() -> A>,
    },
    ImpureAp {
        unions: Unions<R>,
        zipper: Zipper,
        _result: PhantomData<fn() -> A>,
    },
}

/// An effectful program over the row `R` producing an `A`.
///
/// Values are immutable descriptions; they are grown with
/// [`map`](Eff::map) / [`flat_map`](Eff::flat_map) /
/// [`product`](Eff::product) and consumed by handlers. Cloning is
/// cheap: continuations and payloads are reference counted.
///
/// # Monad laws
///
/// 1. `Eff::pure(a).flat_map(f)` ≡ `f(a)`
/// 2. `m.flat_map(Eff::pure)` ≡ `m`
/// 3. `m.flat_map(f).flat_map(g)` ≡ `m.flat_map(|x| f(x).flat_map(g))`
pub struct Eff<R: Row, A: 'static> {
    inner: EffInner<R, A>,
}

impl<R: Row, A: 'static> Eff<R, A> {
    /// A finished program with no remaining effects.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effrow::prelude::*;
    ///
    /// let program: Eff<NoFx, i32> = Eff::pure(42);
    /// assert_eq!(run(program), 42);
    /// ```
    #[must_use]
    pub const fn pure(value: A) -> Self {
        Self {
            inner: EffInner::Pure(value),
        }
    }

    /// An effect invocation together with its continuation.
    ///
    /// Low-level: handlers rebuild programs with this. The caller
    /// asserts that the deque's composed output produces an `A`.
    #[must_use]
    pub fn impure(union: Union<R>, queue: Arrs<R>) -> Self {
        Self {
            inner: EffInner::Impure {
                union,
                queue,
                _result: PhantomData,
            },
        }
    }

    pub(crate) const fn from_inner(inner: EffInner<R, A>) -> Self {
        Self { inner }
    }

    pub(crate) fn into_inner(self) -> EffInner<R, A> {
        self.inner
    }

    /// Whether the program is a finished value.
    #[must_use]
    pub const fn is_pure(&self) -> bool {
        matches!(self.inner, EffInner::Pure(_))
    }

    /// Erases the result type; the payload still holds an `A`.
    ///
    /// Handler plumbing: a [`Translate`](crate::handler::Translate)
    /// implementation builds a typed answer program and erases it at
    /// the boundary. The erased program must only be consumed by
    /// machinery that knows the payload's real type.
    #[must_use]
    pub fn erase(self) -> Eff<R, Value> {
        match self.inner {
            EffInner::Pure(a) => Eff::pure(value(a)),
            EffInner::Impure { union, queue, .. } => Eff::from_inner(EffInner::Impure {
                union,
                queue,
                _result: PhantomData,
            }),
            EffInner::ImpureAp { unions, zipper, .. } => Eff::from_inner(EffInner::ImpureAp {
                unions,
                zipper,
                _result: PhantomData,
            }),
        }
    }

    /// Normalizes an applicative batch to its monadic form.
    ///
    /// The head effect is evaluated first; if a tail remains, it is
    /// rebuilt as a smaller batch whose zipper prepends the head's
    /// answer. Observationally the program is unchanged.
    #[must_use]
    pub fn to_monadic(self) -> Self {
        match self.inner {
            EffInner::ImpureAp { unions, zipper, .. } => {
                let EffInner::Impure { union, queue, .. } =
                    Eff::monadic(unions, zipper).into_inner()
                else {
                    unreachable!("monadic normalization always yields an impure node")
                };
                Self::from_inner(EffInner::Impure {
                    union,
                    queue,
                    _result: PhantomData,
                })
            }
            inner => Self { inner },
        }
    }
}

impl<R: Row, A: 'static> Eff<R, A> {
    /// Reconstructs a typed program from its erased form, claiming the
    /// result on the pure path.
    pub(crate) fn from_erased(erased: Eff<R, Value>) -> Self
    where
        A: Clone,
    {
        match erased.inner {
            EffInner::Pure(payload) => Self::pure(claim::<A>(payload)),
            EffInner::Impure { union, queue, .. } => Self::from_inner(EffInner::Impure {
                union,
                queue,
                _result: PhantomData,
            }),
            EffInner::ImpureAp { unions, zipper, .. } => Self::from_inner(EffInner::ImpureAp {
                unions,
                zipper,
                _result: PhantomData,
            }),
        }
    }

    /// Applies a function to the result of this program.
    ///
    /// On a batch node the zipper is composed with `function`, so the
    /// applicative structure is preserved.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effrow::prelude::*;
    ///
    /// let program: Eff<NoFx, i32> = Eff::pure(21).map(|x| x * 2);
    /// assert_eq!(run(program), 42);
    /// ```
    #[must_use]
    pub fn map<B, F>(self, function: F) -> Eff<R, B>
    where
        A: Clone,
        B: 'static,
        F: Fn(A) -> B + 'static,
    {
        match self.inner {
            EffInner::Pure(a) => Eff::pure(function(a)),
            impure @ EffInner::Impure { .. } => {
                Self { inner: impure }.flat_map(move |a| Eff::pure(function(a)))
            }
            EffInner::ImpureAp { unions, zipper, .. } => {
                let composed =
                    move |answers: Vec<Value>| value(function(claim::<A>(zipper(answers))));
                Eff::from_inner(EffInner::ImpureAp {
                    unions,
                    zipper: Rc::new(composed),
                    _result: PhantomData,
                })
            }
        }
    }

    /// Chains this program with one depending on its result.
    ///
    /// O(1): appends to the continuation deque. A batch node is first
    /// normalized to its monadic form.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effrow::prelude::*;
    ///
    /// let program: Eff<NoFx, i32> = Eff::pure(10).flat_map(|x| Eff::pure(x + 5));
    /// assert_eq!(run(program), 15);
    /// ```
    #[must_use]
    pub fn flat_map<B, F>(self, function: F) -> Eff<R, B>
    where
        A: Clone,
        B: 'static,
        F: Fn(A) -> Eff<R, B> + 'static,
    {
        match self.inner {
            EffInner::Pure(a) => function(a),
            EffInner::Impure { union, queue, .. } => Eff::from_inner(EffInner::Impure {
                union,
                queue: queue.append(function),
                _result: PhantomData,
            }),
            EffInner::ImpureAp { unions, zipper, .. } => {
                let EffInner::Impure { union, queue, .. } =
                    Eff::monadic(unions, zipper).into_inner()
                else {
                    unreachable!("monadic normalization always yields an impure node")
                };
                Eff::from_inner(EffInner::Impure {
                    union,
                    queue: queue.append(function),
                    _result: PhantomData,
                })
            }
        }
    }

    /// Alias for [`flat_map`](Eff::flat_map).
    #[must_use]
    pub fn and_then<B, F>(self, function: F) -> Eff<R, B>
    where
        A: Clone,
        B: 'static,
        F: Fn(A) -> Eff<R, B> + 'static,
    {
        self.flat_map(function)
    }

    /// Sequences two programs, discarding the first result.
    #[must_use]
    pub fn then<B>(self, next: Eff<R, B>) -> Eff<R, B>
    where
        A: Clone,
        B: Clone + 'static,
    {
        self.flat_map(move |_| next.clone())
    }

    /// Combines two programs into a pair, merging their batches.
    ///
    /// The effects of `self` are recorded before those of `other`; when
    /// both sides are batch nodes the result is one batch and both
    /// sides stay visible to interpreters as independent effects. A
    /// monadic side forces sequential composition instead.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effrow::prelude::*;
    ///
    /// let program: Eff<NoFx, (i32, &str)> = Eff::pure(1).product(Eff::pure("two"));
    /// assert_eq!(run(program), (1, "two"));
    /// ```
    #[must_use]
    pub fn product<B>(self, other: Eff<R, B>) -> Eff<R, (A, B)>
    where
        A: Clone,
        B: Clone + 'static,
    {
        match (self.inner, other.inner) {
            (EffInner::Pure(a), EffInner::Pure(b)) => Eff::pure((a, b)),
            (EffInner::Pure(a), EffInner::ImpureAp { unions, zipper, .. }) => {
                let composed = move |answers: Vec<Value>| {
                    let b = claim::<B>(zipper(answers));
                    value((a.clone(), b))
                };
                Eff::from_inner(EffInner::ImpureAp {
                    unions,
                    zipper: Rc::new(composed),
                    _result: PhantomData,
                })
            }
            (EffInner::ImpureAp { unions, zipper, .. }, EffInner::Pure(b)) => {
                let composed = move |answers: Vec<Value>| {
                    let a = claim::<A>(zipper(answers));
                    value((a, b.clone()))
                };
                Eff::from_inner(EffInner::ImpureAp {
                    unions,
                    zipper: Rc::new(composed),
                    _result: PhantomData,
                })
            }
            (
                EffInner::ImpureAp {
                    unions: left,
                    zipper: zip_left,
                    ..
                },
                EffInner::ImpureAp {
                    unions: right,
                    zipper: zip_right,
                    ..
                },
            ) => {
                let boundary = left.size();
                let unions = left.append(right);
                let composed = move |mut answers: Vec<Value>| {
                    let tail = answers.split_off(boundary);
                    let a = claim::<A>(zip_left(answers));
                    let b = claim::<B>(zip_right(tail));
                    value((a, b))
                };
                Eff::from_inner(EffInner::ImpureAp {
                    unions,
                    zipper: Rc::new(composed),
                    _result: PhantomData,
                })
            }
            (EffInner::Pure(a), impure @ EffInner::Impure { .. }) => {
                Eff { inner: impure }.map(move |b| (a.clone(), b))
            }
            (impure @ EffInner::Impure { .. }, EffInner::Pure(b)) => {
                Self { inner: impure }.map(move |a| (a, b.clone()))
            }
            (left, right) => {
                let right = Eff { inner: right };
                Self { inner: left }
                    .flat_map(move |a| right.clone().map(move |b| (a.clone(), b)))
            }
        }
    }

    /// Combines two programs with a binary function, applicatively.
    #[must_use]
    pub fn map2<B, C, F>(self, other: Eff<R, B>, function: F) -> Eff<R, C>
    where
        A: Clone,
        B: Clone + 'static,
        C: 'static,
        F: Fn(A, B) -> C + 'static,
    {
        self.product(other).map(move |(a, b)| function(a, b))
    }
}

impl<R: Row, F: 'static> Eff<R, F> {
    /// Applies a program of functions to a program of operands.
    ///
    /// The operand's effects are recorded before the function's in the
    /// merged batch, matching `operand <*> functions` of the underlying
    /// algebra; interpreters that order batched side effects observe
    /// that convention.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effrow::prelude::*;
    ///
    /// let functions: Eff<NoFx, fn(i32) -> i32> = Eff::pure(|x| x + 1);
    /// let program = functions.ap(Eff::pure(41));
    /// assert_eq!(run(program), 42);
    /// ```
    #[must_use]
    pub fn ap<A, B>(self, operand: Eff<R, A>) -> Eff<R, B>
    where
        F: Fn(A) -> B + Clone,
        A: Clone + 'static,
        B: 'static,
    {
        operand.product(self).map(|(a, function)| function(a))
    }
}

impl<R: Row> Eff<R, Value> {
    /// The monadic form of an applicative batch: evaluate the head, and
    /// rebuild a smaller batch whose zipper prepends the head's answer.
    pub(crate) fn monadic(unions: Unions<R>, zipper: Zipper) -> Self {
        let (head, tail) = unions.into_parts();
        let continuation = Arrs::singleton_raw(move |answer: Value| -> Eff<R, Value> {
            if tail.is_empty() {
                Eff::pure(zipper(vec![answer]))
            } else {
                let rebuilt = Unions::from_vec(tail.clone());
                let zip = Rc::clone(&zipper);
                let prepended = move |mut answers: Vec<Value>| {
                    answers.insert(0, answer.clone());
                    zip(answers)
                };
                Eff::from_inner(EffInner::ImpureAp {
                    unions: rebuilt,
                    zipper: Rc::new(prepended),
                    _result: PhantomData,
                })
            }
        });
        Eff::from_inner(EffInner::Impure {
            union: head,
            queue: continuation,
            _result: PhantomData,
        })
    }

    /// `flat_map` over erased programs; appends a raw arrow so the
    /// payload is never claimed.
    pub(crate) fn flat_map_erased<F>(self, function: F) -> Self
    where
        F: Fn(Value) -> Eff<R, Value> + 'static,
    {
        match self.inner {
            EffInner::Pure(payload) => function(payload),
            EffInner::Impure { union, queue, .. } => Eff::from_inner(EffInner::Impure {
                union,
                queue: queue.append_raw(function),
                _result: PhantomData,
            }),
            EffInner::ImpureAp { unions, zipper, .. } => {
                let EffInner::Impure { union, queue, .. } =
                    Self::monadic(unions, zipper).into_inner()
                else {
                    unreachable!("monadic normalization always yields an impure node")
                };
                Eff::from_inner(EffInner::Impure {
                    union,
                    queue: queue.append_raw(function),
                    _result: PhantomData,
                })
            }
        }
    }
}

impl<R: Row, A: Clone + 'static> Clone for Eff<R, A> {
    fn clone(&self) -> Self {
        match &self.inner {
            EffInner::Pure(a) => Self::pure(a.clone()),
            EffInner::Impure { union, queue, .. } => Self::from_inner(EffInner::Impure {
                union: union.clone(),
                queue: queue.clone(),
                _result: PhantomData,
            }),
            EffInner::ImpureAp { unions, zipper, .. } => Self::from_inner(EffInner::ImpureAp {
                unions: unions.clone(),
                zipper: Rc::clone(zipper),
                _result: PhantomData,
            }),
        }
    }
}

/// Sends one effect invocation, producing a batch of one.
///
/// Adjacent sends combined with [`Eff::product`] / [`Eff::ap`] merge
/// into a single batch instead of forcing sequential interpretation.
///
/// # Examples
///
/// ```rust
/// use effrow::prelude::*;
/// use effrow::effects::writer::{run_writer, tell, WriterEffect};
///
/// type App = Fx![WriterEffect<String>];
///
/// let program: Eff<App, i32> = tell("a".to_string()).then(Eff::pure(7));
/// let (result, log) = run(run_writer(program));
/// assert_eq!(result, 7);
/// assert_eq!(log, vec!["a".to_string()]);
/// ```
#[must_use]
pub fn send<E, R, I, A>(request: Request<E>) -> Eff<R, A>
where
    E: Effect,
    R: Member<E, I>,
    A: 'static,
{
    let unions = Unions::singleton(<R as Member<E, I>>::inject(request));
    let zipper = move |mut answers: Vec<Value>| {
        debug_assert_eq!(answers.len(), 1, "a sent effect forms a batch of exactly one");
        answers
            .pop()
            .expect("a sent effect receives exactly one answer")
    };
    Eff::from_inner(EffInner::ImpureAp {
        unions,
        zipper: Rc::new(zipper),
        _result: PhantomData,
    })
}

enum Piece<A> {
    Val(A),
    Batch { arity: usize, zip: Zipper },
}

/// Runs a list of programs left to right, collecting their results.
///
/// Programs that are pure or batch nodes fuse into one flat batch, so
/// interpreters see all their effects together and the combined zipper
/// runs in constant stack regardless of length. If any element is
/// already monadic the whole sequence is composed monadically instead.
#[must_use]
pub fn sequence<R, A>(programs: Vec<Eff<R, A>>) -> Eff<R, Vec<A>>
where
    R: Row,
    A: Clone + 'static,
{
    if programs
        .iter()
        .any(|program| matches!(program.inner, EffInner::Impure { .. }))
    {
        return sequence_monadic(programs);
    }

    let mut pieces: Vec<Piece<A>> = Vec::with_capacity(programs.len());
    let mut batch: Option<Unions<R>> = None;
    for program in programs {
        match program.inner {
            EffInner::Pure(a) => pieces.push(Piece::Val(a)),
            EffInner::ImpureAp { unions, zipper, .. } => {
                pieces.push(Piece::Batch {
                    arity: unions.size(),
                    zip: zipper,
                });
                batch = Some(match batch {
                    None => unions,
                    Some(accumulated) => accumulated.append(unions),
                });
            }
            EffInner::Impure { .. } => unreachable!("monadic elements are folded above"),
        }
    }

    match batch {
        None => Eff::pure(
            pieces
                .into_iter()
                .map(|piece| match piece {
                    Piece::Val(a) => a,
                    Piece::Batch { .. } => unreachable!("no batch was recorded"),
                })
                .collect(),
        ),
        Some(unions) => {
            let zipper = move |answers: Vec<Value>| {
                let mut answers = answers.into_iter();
                let mut collected: Vec<A> = Vec::with_capacity(pieces.len());
                for piece in &pieces {
                    match piece {
                        Piece::Val(a) => collected.push(a.clone()),
                        Piece::Batch { arity, zip } => {
                            let chunk: Vec<Value> = answers.by_ref().take(*arity).collect();
                            collected.push(claim::<A>(zip(chunk)));
                        }
                    }
                }
                value(collected)
            };
            Eff::from_inner(EffInner::ImpureAp {
                unions,
                zipper: Rc::new(zipper),
                _result: PhantomData,
            })
        }
    }
}

fn sequence_monadic<R, A>(programs: Vec<Eff<R, A>>) -> Eff<R, Vec<A>>
where
    R: Row,
    A: Clone + 'static,
{
    let mut accumulated: Eff<R, Vec<A>> = Eff::pure(Vec::with_capacity(programs.len()));
    for program in programs {
        accumulated = accumulated.flat_map(move |items: Vec<A>| {
            program.clone().map(move |a| {
                let mut items = items.clone();
                items.push(a);
                items
            })
        });
    }
    accumulated
}

/// [`sequence`] over erased programs; used by the translation driver to
/// keep independent translated effects independent.
pub(crate) fn sequence_erased<R: Row>(programs: Vec<Eff<R, Value>>) -> Eff<R, Vec<Value>> {
    if programs
        .iter()
        .any(|program| matches!(program.inner, EffInner::Impure { .. }))
    {
        let mut accumulated: Eff<R, Value> = Eff::pure(value(Vec::<Value>::new()));
        for program in programs {
            accumulated = accumulated.flat_map_erased(move |so_far: Value| {
                let so_far = so_far.clone();
                program.clone().flat_map_erased(move |answer: Value| {
                    let mut items = claim::<Vec<Value>>(so_far.clone());
                    items.push(answer);
                    Eff::pure(value(items))
                })
            });
        }
        return Eff::from_erased(accumulated);
    }

    let mut pieces: Vec<Piece<Value>> = Vec::with_capacity(programs.len());
    let mut batch: Option<Unions<R>> = None;
    for program in programs {
        match program.inner {
            EffInner::Pure(payload) => pieces.push(Piece::Val(payload)),
            EffInner::ImpureAp { unions, zipper, .. } => {
                pieces.push(Piece::Batch {
                    arity: unions.size(),
                    zip: zipper,
                });
                batch = Some(match batch {
                    None => unions,
                    Some(accumulated) => accumulated.append(unions),
                });
            }
            EffInner::Impure { .. } => unreachable!("monadic elements are folded above"),
        }
    }

    match batch {
        None => Eff::pure(
            pieces
                .into_iter()
                .map(|piece| match piece {
                    Piece::Val(payload) => payload,
                    Piece::Batch { .. } => unreachable!("no batch was recorded"),
                })
                .collect(),
        ),
        Some(unions) => {
            let zipper = move |answers: Vec<Value>| {
                let mut answers = answers.into_iter();
                let mut collected: Vec<Value> = Vec::with_capacity(pieces.len());
                for piece in &pieces {
                    match piece {
                        Piece::Val(payload) => collected.push(payload.clone()),
                        Piece::Batch { arity, zip } => {
                            let chunk: Vec<Value> = answers.by_ref().take(*arity).collect();
                            collected.push(zip(chunk));
                        }
                    }
                }
                value(collected)
            };
            Eff::from_inner(EffInner::ImpureAp {
                unions,
                zipper: Rc::new(zipper),
                _result: PhantomData,
            })
        }
    }
}

/// Maps each item to a program and runs them left to right.
#[must_use]
pub fn traverse<R, T, A, F>(items: Vec<T>, function: F) -> Eff<R, Vec<A>>
where
    R: Row,
    A: Clone + 'static,
    F: Fn(T) -> Eff<R, A>,
{
    sequence(items.into_iter().map(function).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::NoFx;
    use crate::runner::run;
    use rstest::rstest;

    #[rstest]
    fn pure_is_pure() {
        let program: Eff<NoFx, i32> = Eff::pure(42);
        assert!(program.is_pure());
    }

    #[rstest]
    fn map_composes() {
        let program: Eff<NoFx, i32> = Eff::pure(10).map(|x| x + 5).map(|x| x * 2);
        assert_eq!(run(program), 30);
    }

    #[rstest]
    fn flat_map_chains() {
        let program: Eff<NoFx, i32> = Eff::pure(1)
            .flat_map(|x| Eff::pure(x + 1))
            .flat_map(|x| Eff::pure(x * 10));
        assert_eq!(run(program), 20);
    }

    #[rstest]
    fn and_then_is_an_alias_for_flat_map() {
        let program: Eff<NoFx, i32> = Eff::pure(10).and_then(|x| Eff::pure(x + 5));
        assert_eq!(run(program), 15);
    }

    #[rstest]
    fn then_discards_the_first_result() {
        let program: Eff<NoFx, i32> = Eff::pure("ignored").then(Eff::pure(42));
        assert_eq!(run(program), 42);
    }

    #[rstest]
    fn product_pairs_results() {
        let program: Eff<NoFx, (i32, i32)> = Eff::pure(1).product(Eff::pure(2));
        assert_eq!(run(program), (1, 2));
    }

    #[rstest]
    fn map2_combines_results() {
        let program: Eff<NoFx, i32> = Eff::pure(20).map2(Eff::pure(22), |a, b| a + b);
        assert_eq!(run(program), 42);
    }

    #[rstest]
    fn ap_applies_pure_functions() {
        let functions: Eff<NoFx, fn(i32) -> i32> = Eff::pure(|x| x * 2);
        assert_eq!(run(functions.ap(Eff::pure(21))), 42);
    }

    #[rstest]
    fn sequence_collects_in_order() {
        let programs: Vec<Eff<NoFx, i32>> = (0..5).map(Eff::pure).collect();
        assert_eq!(run(sequence(programs)), vec![0, 1, 2, 3, 4]);
    }

    #[rstest]
    fn traverse_maps_then_collects() {
        let program = traverse(vec![1, 2, 3], |x| Eff::<NoFx, i32>::pure(x * 10));
        assert_eq!(run(program), vec![10, 20, 30]);
    }

    #[rstest]
    fn deep_flat_map_is_stack_safe() {
        let mut program: Eff<NoFx, i64> = Eff::pure(0);
        for _ in 0..100_000 {
            program = program.flat_map(|x| Eff::pure(x + 1));
        }
        assert_eq!(run(program), 100_000);
    }

    #[rstest]
    fn deep_map_is_stack_safe() {
        let mut program: Eff<NoFx, i64> = Eff::pure(0);
        for _ in 0..100_000 {
            program = program.map(|x| x + 1);
        }
        assert_eq!(run(program), 100_000);
    }

    #[rstest]
    fn cloning_shares_structure() {
        let program: Eff<NoFx, i32> = Eff::pure(1).flat_map(|x| Eff::pure(x + 1));
        let cloned = program.clone();
        assert_eq!(run(program), 2);
        assert_eq!(run(cloned), 2);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::row::NoFx;
    use crate::runner::run;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_monad_left_identity(seed in any::<i32>()) {
            let f = |x: i32| Eff::<NoFx, i32>::pure(x.wrapping_mul(3));
            let left = Eff::<NoFx, i32>::pure(seed).flat_map(f);
            let right = f(seed);
            prop_assert_eq!(run(left), run(right));
        }

        #[test]
        fn prop_monad_right_identity(seed in any::<i32>()) {
            let program = Eff::<NoFx, i32>::pure(seed).flat_map(Eff::pure);
            prop_assert_eq!(run(program), seed);
        }

        #[test]
        fn prop_monad_associativity(seed in any::<i32>()) {
            fn f(x: i32) -> Eff<NoFx, i32> {
                Eff::pure(x.wrapping_add(10))
            }
            fn g(x: i32) -> Eff<NoFx, i32> {
                Eff::pure(x.wrapping_mul(2))
            }
            let left = Eff::<NoFx, i32>::pure(seed).flat_map(f).flat_map(g);
            let right = Eff::<NoFx, i32>::pure(seed).flat_map(|x| f(x).flat_map(g));
            prop_assert_eq!(run(left), run(right));
        }

        #[test]
        fn prop_map_consistent_with_flat_map(seed in any::<i32>()) {
            let mapped = Eff::<NoFx, i32>::pure(seed).map(|x| x.wrapping_add(1));
            let bound = Eff::<NoFx, i32>::pure(seed).flat_map(|x| Eff::pure(x.wrapping_add(1)));
            prop_assert_eq!(run(mapped), run(bound));
        }

        #[test]
        fn prop_sequence_preserves_order(items in prop::collection::vec(any::<i32>(), 0..64)) {
            let expected = items.clone();
            let programs: Vec<Eff<NoFx, i32>> = items.into_iter().map(Eff::pure).collect();
            prop_assert_eq!(run(sequence(programs)), expected);
        }
    }
}

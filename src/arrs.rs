//! The stack-safe deque of Kleisli arrows.
//!
//! [`Arrs`] is the continuation of an impure program node: a sequence
//! of type-erased arrows `Value -> Eff<R, Value>` whose composition,
//! applied to the effect's answer, yields the rest of the program.
//!
//! # Invariants
//!
//! - Composition is associative and the empty deque behaves as `pure`.
//! - [`Arrs::apply`] performs O(1) work per arrow and never recurses
//!   into the program it builds: when an arrow produces an impure node,
//!   the remaining arrows are concatenated onto that node's own deque
//!   and evaluation stops — the work is picked up lazily when a handler
//!   resumes the continuation.
//! - Arrows are reference counted and take `&self`, so one continuation
//!   can be resumed any number of times (non-determinism replays them).
//! - Every typed arrow claims its input; feeding a continuation an
//!   answer of the wrong type is a fatal programmer error.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::eff::{Eff, EffInner};
use crate::effect::{claim, Value};
use crate::row::Row;

/// A type-erased arrow `Value -> Eff<R, Value>`.
///
/// Taking `&self` (rather than consuming) is what makes continuations
/// multi-shot.
pub(crate) trait ErasedArrow<R: Row> {
    fn apply(&self, input: Value) -> Eff<R, Value>;
}

/// An arrow built from a typed Kleisli function.
struct TypedArrow<R, A, B: 'static, F>
where
    R: Row,
    F: Fn(A) -> Eff<R, B>,
{
    function: F,
    _phantom: PhantomData<fn(A) -> (R, B)>,
}

impl<R, A, B, F> ErasedArrow<R> for TypedArrow<R, A, B, F>
where
    R: Row,
    A: Clone + 'static,
    B: 'static,
    F: Fn(A) -> Eff<R, B>,
{
    fn apply(&self, input: Value) -> Eff<R, Value> {
        (self.function)(claim::<A>(input)).erase()
    }
}

/// An arrow already working on erased values.
struct RawArrow<F> {
    function: F,
}

impl<R, F> ErasedArrow<R> for RawArrow<F>
where
    R: Row,
    F: Fn(Value) -> Eff<R, Value>,
{
    fn apply(&self, input: Value) -> Eff<R, Value> {
        (self.function)(input)
    }
}

/// A deque of Kleisli arrows composing into one `A -> Eff<R, B>`.
///
/// The endpoint types are a contract maintained by construction: the
/// first arrow claims the `A`, each arrow feeds the next, and the last
/// one's output payload is the `B` the surrounding program expects.
pub struct Arrs<R: Row> {
    arrows: VecDeque<Rc<dyn ErasedArrow<R>>>,
}

impl<R: Row> Arrs<R> {
    /// The empty deque; behaves as `pure` under [`Arrs::apply`].
    #[must_use]
    pub fn unit() -> Self {
        Self {
            arrows: VecDeque::new(),
        }
    }

    /// A deque of one typed arrow.
    #[must_use]
    pub fn singleton<A, B, F>(function: F) -> Self
    where
        A: Clone + 'static,
        B: 'static,
        F: Fn(A) -> Eff<R, B> + 'static,
    {
        Self::unit().append(function)
    }

    /// A deque of one arrow over erased values.
    pub(crate) fn singleton_raw<F>(function: F) -> Self
    where
        F: Fn(Value) -> Eff<R, Value> + 'static,
    {
        let mut arrows: VecDeque<Rc<dyn ErasedArrow<R>>> = VecDeque::with_capacity(1);
        arrows.push_back(Rc::new(RawArrow { function }));
        Self { arrows }
    }

    /// Appends an arrow at the output end.
    #[must_use]
    pub fn append<B, C, F>(mut self, function: F) -> Self
    where
        B: Clone + 'static,
        C: 'static,
        F: Fn(B) -> Eff<R, C> + 'static,
    {
        self.arrows.push_back(Rc::new(TypedArrow {
            function,
            _phantom: PhantomData,
        }));
        self
    }

    /// Appends an arrow already working on erased values.
    pub(crate) fn append_raw<F>(mut self, function: F) -> Self
    where
        F: Fn(Value) -> Eff<R, Value> + 'static,
    {
        self.arrows.push_back(Rc::new(RawArrow { function }));
        self
    }

    /// Prepends a pure adaptation at the input end.
    #[must_use]
    pub fn contramap<C, A, F>(mut self, function: F) -> Self
    where
        C: Clone + 'static,
        A: 'static,
        F: Fn(C) -> A + 'static,
    {
        let adapt = move |input: C| Eff::pure((function)(input));
        self.arrows.push_front(Rc::new(TypedArrow {
            function: adapt,
            _phantom: PhantomData,
        }));
        self
    }

    /// Rewrites the trailing arrow's output program; the identity on an
    /// empty deque.
    ///
    /// `B` must be the output type of the current trailing arrow.
    #[must_use]
    pub fn map_last<B, G>(mut self, rewrite: G) -> Self
    where
        B: Clone + 'static,
        G: Fn(Eff<R, B>) -> Eff<R, B> + 'static,
    {
        let Some(last) = self.arrows.pop_back() else {
            return self;
        };
        let function = move |input: Value| -> Eff<R, Value> {
            let produced: Eff<R, B> = Eff::from_erased(last.apply(input));
            rewrite(produced).erase()
        };
        self.arrows.push_back(Rc::new(RawArrow { function }));
        self
    }

    /// Whether the deque is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arrows.is_empty()
    }

    /// Number of arrows in the deque.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arrows.len()
    }

    /// Applies the composed arrow to a typed input.
    ///
    /// # Panics
    ///
    /// Panics (fatally) if `A` is not the deque's input type or `B` not
    /// its output type.
    #[must_use]
    pub fn apply<A, B>(&self, input: A) -> Eff<R, B>
    where
        A: 'static,
        B: Clone + 'static,
    {
        Eff::from_erased(self.apply_erased(Rc::new(input)))
    }

    /// The iterative composer: walks the deque with a live value and
    /// stops at the first impure node, lazily prepending the remaining
    /// arrows to that node's own continuation.
    pub(crate) fn apply_erased(&self, input: Value) -> Eff<R, Value> {
        let mut remaining = self.arrows.clone();
        let mut current = input;
        while let Some(arrow) = remaining.pop_front() {
            match arrow.apply(current).into_inner() {
                EffInner::Pure(next) => current = next,
                EffInner::Impure { union, mut queue, .. } => {
                    queue.arrows.extend(remaining);
                    return Eff::from_inner(EffInner::Impure {
                        union,
                        queue,
                        _result: PhantomData,
                    });
                }
                EffInner::ImpureAp { unions, zipper, .. } => {
                    // Normalize the batch to its monadic form, then
                    // hand the rest of this deque to it.
                    let EffInner::Impure { union, mut queue, .. } =
                        Eff::monadic(unions, zipper).into_inner()
                    else {
                        unreachable!("monadic normalization always yields an impure node")
                    };
                    queue.arrows.extend(remaining);
                    return Eff::from_inner(EffInner::Impure {
                        union,
                        queue,
                        _result: PhantomData,
                    });
                }
            }
        }
        Eff::pure(current)
    }
}

impl<R: Row> Clone for Arrs<R> {
    fn clone(&self) -> Self {
        Self {
            arrows: self.arrows.clone(),
        }
    }
}

impl<R: Row> Default for Arrs<R> {
    fn default() -> Self {
        Self::unit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::NoFx;
    use crate::runner::run;
    use rstest::rstest;

    #[rstest]
    fn unit_behaves_as_pure() {
        let arrs: Arrs<NoFx> = Arrs::unit();
        let program: Eff<NoFx, i32> = arrs.apply(42);
        assert_eq!(run(program), 42);
    }

    #[rstest]
    fn singleton_applies_its_arrow() {
        let arrs: Arrs<NoFx> = Arrs::singleton(|x: i32| Eff::pure(x * 2));
        assert_eq!(run(arrs.apply::<i32, i32>(21)), 42);
    }

    #[rstest]
    fn append_composes_left_to_right() {
        let arrs: Arrs<NoFx> = Arrs::singleton(|x: i32| Eff::pure(x + 1))
            .append(|x: i32| Eff::pure(x * 10));
        assert_eq!(run(arrs.apply::<i32, i32>(4)), 50);
    }

    #[rstest]
    fn contramap_adapts_the_input() {
        let arrs: Arrs<NoFx> =
            Arrs::singleton(|x: i32| Eff::pure(x + 1)).contramap(|text: String| text.len() as i32);
        assert_eq!(run(arrs.apply::<String, i32>("four".to_string())), 5);
    }

    #[rstest]
    fn map_last_rewrites_the_trailing_program() {
        let arrs: Arrs<NoFx> = Arrs::singleton(|x: i32| Eff::pure(x + 1))
            .map_last(|program: Eff<NoFx, i32>| program.map(|x| x * 3));
        assert_eq!(run(arrs.apply::<i32, i32>(1)), 6);
    }

    #[rstest]
    fn map_last_on_empty_deque_is_identity() {
        let arrs: Arrs<NoFx> =
            Arrs::unit().map_last(|program: Eff<NoFx, i32>| program.map(|x| x + 1));
        assert!(arrs.is_empty());
    }

    #[rstest]
    fn apply_is_stack_safe_for_long_deques() {
        let mut arrs: Arrs<NoFx> = Arrs::unit();
        for _ in 0..100_000 {
            arrs = arrs.append(|x: i64| Eff::pure(x + 1));
        }
        assert_eq!(arrs.len(), 100_000);
        assert_eq!(run(arrs.apply::<i64, i64>(0)), 100_000);
    }

    #[rstest]
    fn arrows_are_multi_shot() {
        let arrs: Arrs<NoFx> = Arrs::singleton(|x: i32| Eff::pure(x + 1));
        assert_eq!(run(arrs.apply::<i32, i32>(1)), 2);
        assert_eq!(run(arrs.apply::<i32, i32>(10)), 11);
    }
}

//! Effect constructors and their runtime requests.
//!
//! An *effect* is a capability a program may invoke: state, output
//! accumulation, non-determinism, and so on. At the type level an effect
//! is a marker implementing [`Effect`]; at runtime one invocation of an
//! effect is a [`Request`] carrying an [`OperationTag`] and an opaque
//! argument payload.
//!
//! # Erased payloads
//!
//! Arguments and answers travel through the interpreter machinery as
//! [`Value`]s (`Rc<dyn Any>`). Claiming a `Value` back into a typed `T`
//! is a runtime-checked operation: a mismatch is a fatal programmer
//! error and panics. Cast sites are confined to this module, the arrow
//! deque, and the union batch — each paired with the invariant that
//! justifies it.
//!
//! # Examples
//!
//! ```rust
//! use effrow::prelude::*;
//!
//! struct Tick;
//!
//! impl Effect for Tick {
//!     const NAME: &'static str = "Tick";
//! }
//!
//! let request: Request<Tick> = Request::new(OperationTag::new(1), 7u64);
//! assert_eq!(request.operation(), OperationTag::new(1));
//! assert_eq!(request.arguments::<u64>(), 7);
//! ```

use std::any::{type_name, Any};
use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;
use std::rc::Rc;

/// A type-erased payload shared between requests, continuations, and
/// applicative zippers.
///
/// Reference counting (rather than a `Box`) lets one payload feed a
/// continuation that is resumed more than once, which non-determinism
/// handlers rely on.
pub type Value = Rc<dyn Any>;

/// Erases a typed value into a [`Value`].
#[must_use]
pub fn value<T: 'static>(inner: T) -> Value {
    Rc::new(inner)
}

/// Claims a typed value back out of a [`Value`].
///
/// If the payload is uniquely owned it is moved out; if it is shared
/// (a multi-shot continuation resumed the same value twice) it is
/// cloned.
///
/// # Panics
///
/// Panics if the payload does not hold a `T`. This is a fatal
/// programmer error: some handler answered a request with a value of
/// the wrong type.
#[must_use]
pub fn claim<T: Clone + 'static>(payload: Value) -> T {
    let typed = payload.downcast::<T>().unwrap_or_else(|_| {
        panic!(
            "payload type mismatch: expected {}",
            type_name::<T>()
        )
    });
    Rc::try_unwrap(typed).unwrap_or_else(|shared| (*shared).clone())
}

/// A tag identifying one operation of an effect.
///
/// Each operation an effect exposes (`get` and `put` for state, `tell`
/// for a writer, ...) carries a distinct tag; handlers dispatch on it.
///
/// # Examples
///
/// ```rust
/// use effrow::effect::OperationTag;
///
/// const GET: OperationTag = OperationTag::new(10);
/// const PUT: OperationTag = OperationTag::new(11);
/// assert_ne!(GET, PUT);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationTag(u32);

impl OperationTag {
    /// Creates a new operation tag with the given value.
    #[must_use]
    #[inline]
    pub const fn new(tag: u32) -> Self {
        Self(tag)
    }
}

/// A marker trait for effect constructors.
///
/// Implementors are zero-sized markers; the data of an invocation lives
/// in its [`Request`]. `NAME` shows up in fatal diagnostics.
///
/// # Examples
///
/// ```rust
/// use effrow::effect::Effect;
///
/// struct Console;
///
/// impl Effect for Console {
///     const NAME: &'static str = "Console";
/// }
///
/// assert_eq!(Console::NAME, "Console");
/// ```
pub trait Effect: 'static {
    /// A human-readable name used in diagnostics.
    const NAME: &'static str;
}

/// One invocation of an effect: an operation tag plus erased arguments.
///
/// The answer type of a request is not tracked here; the continuation
/// that consumes the answer claims it, and a mismatch panics. Requests
/// are cheap to clone (the payload is reference counted).
pub struct Request<E: Effect> {
    operation: OperationTag,
    arguments: Value,
    _effect: PhantomData<fn() -> E>,
}

impl<E: Effect> Request<E> {
    /// Packages an operation and its arguments into a request.
    #[must_use]
    pub fn new<T: 'static>(operation: OperationTag, arguments: T) -> Self {
        Self {
            operation,
            arguments: value(arguments),
            _effect: PhantomData,
        }
    }

    /// Rebuilds a request from an already-erased payload.
    #[must_use]
    pub(crate) const fn from_parts(operation: OperationTag, arguments: Value) -> Self {
        Self {
            operation,
            arguments,
            _effect: PhantomData,
        }
    }

    /// The operation this request invokes.
    #[must_use]
    #[inline]
    pub const fn operation(&self) -> OperationTag {
        self.operation
    }

    /// Claims the arguments as a `T`.
    ///
    /// # Panics
    ///
    /// Panics if the arguments were not created from a `T`; a handler
    /// dispatching on the wrong operation tag is the usual culprit.
    #[must_use]
    pub fn arguments<T: Clone + 'static>(&self) -> T {
        claim(Rc::clone(&self.arguments))
    }

    /// Splits the request back into tag and erased arguments.
    #[must_use]
    pub(crate) fn into_parts(self) -> (OperationTag, Value) {
        (self.operation, self.arguments)
    }
}

impl<E: Effect> Clone for Request<E> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation,
            arguments: Rc::clone(&self.arguments),
            _effect: PhantomData,
        }
    }
}

impl<E: Effect> Debug for Request<E> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Request")
            .field("effect", &E::NAME)
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct Probe;

    impl Effect for Probe {
        const NAME: &'static str = "Probe";
    }

    #[rstest]
    fn operation_tag_equality() {
        assert_eq!(OperationTag::new(1), OperationTag::new(1));
        assert_ne!(OperationTag::new(1), OperationTag::new(2));
    }

    #[rstest]
    fn value_roundtrips_through_claim() {
        let erased = value(41i64);
        assert_eq!(claim::<i64>(erased), 41);
    }

    #[rstest]
    fn claim_clones_shared_payloads() {
        let erased = value(String::from("shared"));
        let other = Rc::clone(&erased);
        assert_eq!(claim::<String>(erased), "shared");
        assert_eq!(claim::<String>(other), "shared");
    }

    #[rstest]
    #[should_panic(expected = "payload type mismatch")]
    fn claim_with_wrong_type_is_fatal() {
        let erased = value(41i64);
        let _: String = claim(erased);
    }

    #[rstest]
    fn request_exposes_operation_and_arguments() {
        let request: Request<Probe> = Request::new(OperationTag::new(9), vec![1, 2, 3]);
        assert_eq!(request.operation(), OperationTag::new(9));
        assert_eq!(request.arguments::<Vec<i32>>(), vec![1, 2, 3]);
    }

    #[rstest]
    fn request_clone_shares_the_payload() {
        let request: Request<Probe> = Request::new(OperationTag::new(9), 5u8);
        let cloned = request.clone();
        assert_eq!(request.arguments::<u8>(), cloned.arguments::<u8>());
    }

    #[rstest]
    fn request_debug_names_the_effect() {
        let request: Request<Probe> = Request::new(OperationTag::new(3), ());
        let rendered = format!("{request:?}");
        assert!(rendered.contains("Probe"));
    }
}

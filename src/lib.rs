//! # effrow
//!
//! An extensible-effects core for Rust: programs describe computations
//! over an open row of effect capabilities, and independent
//! interpreters peel effects off the row one at a time, in any order,
//! until only a value remains.
//!
//! ## Overview
//!
//! - **Programs** — [`Eff<R, A>`](eff::Eff), built with
//!   [`pure`](eff::Eff::pure), [`send`](eff::send) and the monadic /
//!   applicative combinators. Independent effects combined with
//!   [`product`](eff::Eff::product) / [`ap`](eff::Eff::ap) stay visible
//!   to interpreters as one batch.
//! - **Rows** — type-level lists of effect markers
//!   ([`Fx!`](crate::Fx), [`NoFx`](row::NoFx)), with membership
//!   witnesses ([`Member`](member::Member)) resolved by trait
//!   inference and row weakening via [`eff_into`](into::eff_into).
//! - **Interpreters** — the [`handler`] toolbox over one stack-safe
//!   kernel ([`interpret`](crate::interpret)); the basic effect
//!   modules live in [`effects`].
//!
//! ## Example
//!
//! ```rust
//! use effrow::prelude::*;
//! use effrow::effects::state::{get, put, run_state, StateEffect};
//! use effrow::effects::writer::{run_writer, tell, WriterEffect};
//!
//! type App = Fx![WriterEffect<String>, StateEffect<i32>];
//!
//! let program: Eff<App, i32> = tell("start".to_string())
//!     .then(get())
//!     .flat_map(|x: i32| put(x + 1))
//!     .then(get());
//!
//! let ((result, log), state) = run(run_state(run_writer(program), 41));
//! assert_eq!(result, 42);
//! assert_eq!(log, vec!["start".to_string()]);
//! assert_eq!(state, 42);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// Note: closures threaded through type-erased arrows make some
// higher-order signatures unavoidably wide.
#![allow(clippy::type_complexity)]
#![allow(clippy::module_name_repetitions)]

pub mod arrs;
pub mod eff;
pub mod effect;
pub mod effects;
pub mod handler;
pub mod interpret;
pub mod into;
pub mod member;
pub mod row;
pub mod runner;
pub mod union;

/// Prelude: the core types and combinators.
///
/// Effect modules are imported by path (`effrow::effects::state::...`)
/// so their short operation names stay unambiguous.
pub mod prelude {
    pub use crate::arrs::Arrs;
    pub use crate::eff::{send, sequence, traverse, Eff};
    pub use crate::effect::{claim, value, Effect, OperationTag, Request, Value};
    pub use crate::handler::{
        intercept, interpret, interpret_state, interpret_unsafe, run_fold, transform, translate,
        translate_nat, Batched, BatchedState, LeftFold, NaturalTransformation, Recurse,
        SideEffect, StateRecurse, Translate,
    };
    pub use crate::interpret::{
        intercept_loop, intercept_stateless_loop, interpret_loop, interpret_stateless_loop,
        BatchContinuation, Continuation, Loop, StatelessLoop, StatelessStep, Step,
    };
    pub use crate::into::{eff_into, IntoRow};
    pub use crate::member::{Here, Member, MemberInOut, There};
    pub use crate::row::{Fx1, Fx2, Fx3, Fx4, Fx5, NoFx, Row, RowCons, RowNil};
    pub use crate::runner::{detach, run, run_pure, MonadEffect};
    pub use crate::union::{CollectedUnions, Union, Unions};
    pub use crate::Fx;
}

//! Portfolio valuation engine: per-company discounted-cash-flow models with
//! beta relevering, a comps table, user-override persistence across rebuilds
//! and a WACC x terminal-growth sensitivity grid.
//!
//! Pure computation over already-normalized inputs. Data acquisition and
//! workbook persistence live in collaborators; the engine is a deterministic
//! function from (financial inputs, assumptions, prior overrides) to
//! (valuation outputs, sensitivity table).

pub mod comps;
pub mod dcf;
pub mod engine;
pub mod error;
pub mod overrides;
pub mod portfolio;
pub mod resolver;
pub mod sensitivity;
pub mod types;
pub mod wacc;

pub use engine::{run_valuation, EngineInput, EngineOutput};
pub use error::ValuationError;
pub use types::*;

/// Standard result type for all valuation operations
pub type ValuationResult<T> = Result<T, ValuationError>;

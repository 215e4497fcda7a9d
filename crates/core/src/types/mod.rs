//! Core types for the coffee catalog.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod coffee;
pub mod id;
pub mod price;
pub mod tag;

pub use coffee::{Coffee, CoffeeChanges, CoffeeError, NewCoffee};
pub use id::*;
pub use price::{Price, PriceError};
pub use tag::Tag;

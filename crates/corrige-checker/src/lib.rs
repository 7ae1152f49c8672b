//! Corrige Checker crate - word-list dictionary implementing `SpellLookup`.
//!
//! Loads a newline-separated word list (or the compiled-in English list) and
//! answers correctness queries and ranked edit-distance suggestions.

pub mod dictionary;

pub use dictionary::{Dictionary, MAX_EDIT_DISTANCE};

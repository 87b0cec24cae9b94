//! Tokenization shared by the TF-IDF semantic index in [`crate::semantic`].

mod lexical;

pub use lexical::tokenize;

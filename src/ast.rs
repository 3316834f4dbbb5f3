//! # Sheet Formula Language - Abstract Syntax Tree
//!
//! This module defines the tokens and the syntax tree of the budget
//! spreadsheet formula language.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer, with positions
//! - **[expressions]** - The closed [`Node`] tree and its traversal
//! - **[operators]** - Binary and unary operators
//! - **[query]** - `from ... select/calculate` blocks
//!
//! ## Quick Start
//!
//! ```text
//! =from transactions where acct.offbudget = 0 calculate { sum(amount) }
//! ```
//!
//! A cell holding this formula evaluates to the total amount of all on-budget
//! transactions.
//!
//! ## Core Concepts
//!
//! ### Formula vs. Plain Cells
//!
//! Only input starting with `=` is a formula. Anything else is kept as one
//! string literal, so plain text can be stored in a cell unchanged:
//!
//! ```text
//! =1 + 2        // formula, evaluates to 3
//! Groceries     // plain string "Groceries"
//! ```
//!
//! ### Names and Sheets
//!
//! Bare names refer to cells of the current sheet. `sheet!cell` refers to a
//! cell of another sheet and is kept as one symbol:
//!
//! ```text
//! =budget201701!total - spent
//! ```
//!
//! ### Member Chains
//!
//! Inside queries, dotted names follow foreign keys and become SQL joins:
//!
//! ```text
//! =from transactions where description.transfer_acct.offbudget = 1 select { id }
//! ```
//!
//! ## Examples
//!
//! ### Conditional
//!
//! ```text
//! =if (spent > budgeted) { "over" } else { "ok" }
//! ```
//!
//! ### Row Query
//!
//! ```text
//! =from transactions where amount < 0 select { date, amount as spent }
//! ```
pub mod expressions;
pub mod operators;
pub mod query;
pub mod tokens;

pub use expressions::{Node, NodeKind, Property, Rewrite, Walk};
pub use operators::{BinOp, UnaryOp};
pub use query::{QueryNode, SelectItem};
pub use tokens::{Position, Token, TokenKind};

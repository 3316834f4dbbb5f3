//! Documentation content for the sheet CLI

use super::CliError;

/// Available documentation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocCategory {
    Syntax,
    Operators,
    Functions,
    Queries,
    Cells,
    Bytecode,
}

impl DocCategory {
    /// Parse category name from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "syntax" => Some(Self::Syntax),
            "operators" | "ops" => Some(Self::Operators),
            "functions" | "function" | "fn" => Some(Self::Functions),
            "queries" | "query" | "from" => Some(Self::Queries),
            "cells" | "cell" | "sheets" => Some(Self::Cells),
            "bytecode" | "vm" | "compile" => Some(Self::Bytecode),
            _ => None,
        }
    }
}

/// Get the docs overview (category listing)
pub fn get_docs_overview() -> &'static str {
    r#"SHEET DOCUMENTATION

Sheet formulas compute budget cells. A cell whose text starts with = is a
formula; any other text is stored as a plain string.

DOCUMENTATION CATEGORIES

  syntax            Literals, names, precedence and if expressions
  operators         Arithmetic, comparison, pattern and logical operators
  functions         Builtin functions
  queries           from ... where ... select/calculate blocks
  cells             Cell names, sheet references and scopes
  bytecode          What `sheet compile` prints

QUICK REFERENCE

  =1 + 2                            Arithmetic
  =budget!total - spent             Cell references
  =if (x > 0) { x } else { 0 }      Conditionals
  =from transactions where acct.offbudget = 0 calculate { sum(amount) }

Run 'sheet docs <category>' for detailed documentation.
"#
}

/// Get documentation for a specific category
pub fn get_doc_category(name: &str) -> Result<&'static str, CliError> {
    match DocCategory::parse(name) {
        Some(DocCategory::Syntax) => Ok(SYNTAX_DOC),
        Some(DocCategory::Operators) => Ok(OPERATORS_DOC),
        Some(DocCategory::Functions) => Ok(FUNCTIONS_DOC),
        Some(DocCategory::Queries) => Ok(QUERIES_DOC),
        Some(DocCategory::Cells) => Ok(CELLS_DOC),
        Some(DocCategory::Bytecode) => Ok(BYTECODE_DOC),
        None => Err(CliError::UnknownCategory(name.to_string())),
    }
}

const SYNTAX_DOC: &str = r#"SYNTAX - Formula Notation

FORMULA MODE
  =expr             Formula; everything after = is parsed
  text              Plain string cell, stored as-is
  (empty)           Empty program, evaluates to ""

LITERALS
  42  -7            Integers (a leading minus folds into the literal)
  1.5  -0.25        Floats
  "rent"  'rent'    Strings; escapes \n \t \r, any other \c is c
  true  false       Booleans

PRECEDENCE (lowest first)
  or
  and
  not x
  = != < > <= >= =~ !=~      (left-associative chain)
  +
  -
  *
  /
  -x
  literals, names, (expr), calls, queries, if

CONDITIONALS
  if (cond) { then } else { otherwise }
  if (cond) { then }                without else, a false condition
                                    leaves its own value as the result
"#;

const OPERATORS_DOC: &str = r#"OPERATORS - Arithmetic, Comparison and Logic

ARITHMETIC
  a + b             Addition; joins strings when either side is a string
  a - b  a * b      Subtraction, multiplication
  a / b             Division; inexact integer division gives a float
  -a                Negation

  Integer arithmetic stays integral. Mixing integers and floats is done in
  decimal, so 0.1 * 3 is 0.3. null counts as 0.

COMPARISON
  =  !=             Equality (1 = 1.0 is true)
  <  >  <=  >=      Ordering for numbers and strings
  =~  !=~           LIKE patterns: % any run, _ one character

LOGIC
  a and b           a when a is falsy, else b
  a or b            a when a is truthy, else b
  not a             true when a is falsy

  Falsy: null, false, 0, "", empty arrays and rows.
"#;

const FUNCTIONS_DOC: &str = r#"FUNCTIONS - Builtins

  number(x)         String to number (0 when unparsable)
  abs(x)            Absolute value
  round(x)          Nearest integer
  floor(x)  ceil(x) Round down / up
  min(a, ...)       Smallest argument; rows from select queries are spliced in
  max(a, ...)       Largest argument
  sum(a, ...)       Sum of all arguments
  length(x)         Characters of a string, items of a list
  upper(s)  lower(s)
  concat(a, ...)    Join as strings, skipping null
  coalesce(a, ...)  First non-null argument

Calling a name that is not a registered function is a runtime error.
"#;

const QUERIES_DOC: &str = r#"QUERIES - from Blocks

FORMS
  from <table> [where <expr>] [groupby <expr>] select { expr [as name], ... }
  from <table> [where <expr>] [groupby <expr>] calculate { expr }

  select evaluates to a list of rows, calculate to a single value.

JOINS
  acct.offbudget                    LEFT JOIN accounts on transactions.acct
  description.transfer_acct.name    one join per hop

RENDERING
  x = null          x IS NULL
  x != null         x IS NOT NULL
  x =~ "a%"         x LIKE "a%"

  Transactions additionally filter isParent = 0 AND tombstone = 0.

EXAMPLE
  =from transactions
     where acct.offbudget = 0 and category = null
     calculate { count(date) }
"#;

const CELLS_DOC: &str = r#"CELLS - Names and Scopes

  total             Cell in the current scope: <scope>!total
  budget!total      Cell in another sheet

The result of a formula is stored in <scope>!<binding>. Both default to
sheet!result and can be changed with --scope/--binding or a config file.

Unset cells read as null.
"#;

const BYTECODE_DOC: &str = r#"BYTECODE - Compiled Programs

`sheet compile` prints the program as JSON: the instruction list, the cells
it reads and the queries it issues.

INSTRUCTIONS
  MOV src -> dst            Copy a value
  BOP op left right         Binary operator, result in REG1
  UOP op target             Unary operator, result in REG1
  CALL name(args)           Builtin call, result in REG1
  QUERY sql                 Pause until the query result arrives in REG1
  JUMPF cond -> n           Jump when cond is falsy
  JUMPT cond -> n           Jump when cond is truthy

OPERANDS
  REG1                      Result register
  SP(n)                     Stack slot
  VAR(sheet!cell)           Cell
  literal                   Constant

Use `sheet compile --listing` for a numbered text listing instead of JSON.
"#;

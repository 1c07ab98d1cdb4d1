//! Map the rows of CSV files to and from flat record types.
//!
//! A record type is any struct with named fields deriving serde's `Deserialize`
//! (for reading) and `Serialize` (for writing) whose fields are text, integers,
//! floats, or dates. Fields map to columns by position:
//!
//! ```
//! use flatcsv::{CsvSettings, FieldPlan};
//! use flatcsv::de::from_line;
//! use flatcsv::ser::to_string;
//!
//! #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
//! struct Person {
//!     name: String,
//!     surname: String,
//!     age: i32,
//! }
//!
//! let settings = CsvSettings::default();
//! let plan = FieldPlan::of::<Person>(None).unwrap();
//! let p: Person = from_line("Andrea,Ferretti,34", &plan, &settings).unwrap();
//! assert_eq!(to_string(&p, &plan, &settings).unwrap(), "Andrea,Ferretti,34\n");
//! ```
//!
//! See [`table`] for reading and writing whole files and [`datetime`]/[`date`]
//! for date fields.
pub mod conv_error;
pub mod field_plan;
pub mod parsing;
pub(crate) mod probe;
pub mod serde_common;
pub mod de;
pub mod ser;
pub mod table;
mod temporal;
mod tokenize;

pub use temporal::{date, datetime};
pub use field_plan::{FieldKind, FieldPlan};
pub use serde_common::{CsvSettings, DError, SError};
pub use table::{read_raw, read_records, write_records};

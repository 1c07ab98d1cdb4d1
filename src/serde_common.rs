//! Settings and errors shared by the CSV readers and writers
use std::path::PathBuf;
use std::{fmt::Display, error::Error};
use serde::{ser, de};
use crate::conv_error::ConvError;
use crate::field_plan::PError;
use crate::tokenize::SpaceSkipper;

/// Settings for reading and writing CSV data
///
/// To use, instantiate the default version with `CsvSettings::default()` and
/// modify the desired settings with the public methods:
///
/// ```
/// # use flatcsv::serde_common::CsvSettings;
/// let settings = CsvSettings::default()
///     .separator(b'\t')
///     .skip_header(true)
///     .date_layout("%Y-%m-%d %H:%M");
/// ```
///
/// The separator, quote, escape and terminator must be ASCII bytes.
#[derive(Debug, Clone)]
pub struct CsvSettings {
    pub(crate) separator: u8,
    pub(crate) quote: Option<u8>,
    pub(crate) escape: Option<u8>,
    pub(crate) skip_initial_space: bool,
    pub(crate) skip_header: bool,
    pub(crate) write_header: bool,
    pub(crate) quote_always: bool,
    pub(crate) terminator: u8,
    pub(crate) date_layout: Option<String>,
}

impl CsvSettings {
    /// Set the field separator. Default is `,`.
    ///
    /// # Panics
    /// If `separator` is not ASCII.
    pub fn separator(mut self, separator: u8) -> Self {
        assert!(separator.is_ascii(), "CSV separator must be an ASCII byte");
        self.separator = separator;
        self
    }

    /// Set the quote character, or disable quoting entirely with `None`.
    ///
    /// Default is `Some(b'"')`. With quoting disabled, the writer never quotes
    /// a field, so fields containing the separator will not read back correctly.
    ///
    /// # Panics
    /// If `quote` is not ASCII.
    pub fn quote(mut self, quote: Option<u8>) -> Self {
        assert!(quote.map_or(true, |q| q.is_ascii()), "CSV quote character must be an ASCII byte");
        self.quote = quote;
        self
    }

    /// Set the character that escapes a quote inside a quoted field.
    ///
    /// Default is `Some(b'"')`, i.e. quotes are escaped by doubling them. Passing
    /// `None` or the quote character itself both mean doubling.
    ///
    /// # Panics
    /// If `escape` is not ASCII.
    pub fn escape(mut self, escape: Option<u8>) -> Self {
        assert!(escape.map_or(true, |e| e.is_ascii()), "CSV escape character must be an ASCII byte");
        self.escape = escape;
        self
    }

    /// Set whether to drop spaces at the start of every field when reading. Default is `false`.
    ///
    /// Spaces inside a quoted field are kept, and a quote that follows the dropped
    /// spaces still starts a quoted field.
    pub fn skip_initial_space(mut self, skip: bool) -> Self {
        self.skip_initial_space = skip;
        self
    }

    /// Set whether the first row of the input is a header to be dropped. Default is `false`.
    pub fn skip_header(mut self, skip: bool) -> Self {
        self.skip_header = skip;
        self
    }

    /// Set whether writers emit the field names as the first row. Default is `false`.
    pub fn write_header(mut self, write: bool) -> Self {
        self.write_header = write;
        self
    }

    /// Set whether the writer quotes every field, not just those that need it. Default is `false`.
    pub fn quote_always(mut self, always: bool) -> Self {
        self.quote_always = always;
        self
    }

    /// Set the byte written after each row. Default is `\n`.
    ///
    /// Readers accept `\n`, `\r` and `\r\n` when this is `\n` or `\r`; any other
    /// byte is used as the only row terminator.
    ///
    /// # Panics
    /// If `terminator` is not ASCII.
    pub fn terminator(mut self, terminator: u8) -> Self {
        assert!(terminator.is_ascii(), "CSV terminator must be an ASCII byte");
        self.terminator = terminator;
        self
    }

    /// Set the strftime-style layout used for all date and time fields, e.g. `"%Y-%m-%d"`.
    ///
    /// There is no default; record types with date fields require this.
    pub fn date_layout(mut self, layout: &str) -> Self {
        self.date_layout = Some(layout.to_string());
        self
    }

    pub(crate) fn layout(&self) -> Option<&str> {
        self.date_layout.as_deref()
    }

    /// A tokenizer configured to match these settings
    pub(crate) fn reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder.has_headers(false)
            .flexible(true)
            .delimiter(self.separator);

        if let Some(q) = self.quote {
            builder.quote(q).quoting(true);
        } else {
            builder.quoting(false);
        }

        match self.escape {
            Some(e) if self.quote != Some(e) => {
                builder.double_quote(false).escape(Some(e));
            },
            _ => {
                builder.double_quote(true).escape(None);
            }
        }

        if self.terminator != b'\n' && self.terminator != b'\r' {
            builder.terminator(csv::Terminator::Any(self.terminator));
        }

        builder
    }

    /// Open a tokenizer over `input` configured to match these settings
    pub(crate) fn reader<R: std::io::Read>(&self, input: R) -> csv::Reader<SpaceSkipper<R>> {
        self.reader_builder().from_reader(SpaceSkipper::new(input, self))
    }
}

impl Default for CsvSettings {
    fn default() -> Self {
        Self {
            separator: b',',
            quote: Some(b'"'),
            escape: Some(b'"'),
            skip_initial_space: false,
            skip_header: false,
            write_header: false,
            quote_always: false,
            terminator: b'\n',
            date_layout: None,
        }
    }
}


/// A type alias for `Result` with [`SError`] as the error type.
pub type SResult<T> = Result<T, SError>;

/// Errors that can occur while writing records as CSV
#[derive(Debug)]
pub enum SError {
    /// Indicates that a field plan could not be built for the record type.
    PlanError(PError),
    /// Indicates that the record being written does not have the shape the field plan describes.
    PlanMismatch(String),
    /// Indicates a value that has no CSV representation, with the field it was found in if known.
    UnsupportedValue{field: Option<String>, found: &'static str},
    /// Indicates that a field's value could not be converted to text.
    ConversionError{field: String, source: ConvError},
    /// Indicates that the output file could not be created.
    FileAccessError{path: PathBuf, source: std::io::Error},
    /// Indicates an error writing the data
    WriteError(std::io::Error),
    /// Indicates a failure during serialization
    SerializationFailure(String),
}

impl Display for SError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PlanError(e) => write!(f, "Error building field plan: {e}"),
            Self::PlanMismatch(msg) => write!(f, "Record does not match the field plan: {msg}"),
            Self::UnsupportedValue { field, found } => {
                if let Some(field) = field {
                    write!(f, "The field '{field}' holds {found}, which cannot be written to a CSV column")
                } else {
                    write!(f, "Expected a struct with named fields, found {found}")
                }
            },
            Self::ConversionError { field, source } => write!(f, "Error writing field '{field}': {source}"),
            Self::FileAccessError { path, source } => write!(f, "Could not open {} for writing: {source}", path.display()),
            Self::WriteError(e) => write!(f, "Error writing data: {e}"),
            Self::SerializationFailure(msg) => write!(f, "Error serializing data: {msg}"),
        }
    }
}

impl Error for SError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PlanError(e) => Some(e),
            Self::ConversionError { source, .. } => Some(source),
            Self::FileAccessError { source, .. } => Some(source),
            Self::WriteError(e) => Some(e),
            _ => None,
        }
    }
}

impl ser::Error for SError {
    fn custom<T>(msg:T) -> Self where T:Display {
        Self::SerializationFailure(msg.to_string())
    }
}

impl From<std::io::Error> for SError {
    fn from(value: std::io::Error) -> Self {
        Self::WriteError(value)
    }
}

impl From<PError> for SError {
    fn from(value: PError) -> Self {
        Self::PlanError(value)
    }
}

/// A type alias for `Result` with [`DError`] as the error type.
pub type DResult<T> = Result<T, DError>;

/// Errors that can occur while reading CSV rows into records.
///
/// Row numbers count physical records from 1, including a skipped header.
#[derive(Debug)]
pub enum DError {
    /// Indicates that a field plan could not be built for the record type.
    PlanError(PError),
    /// Indicates that the record type being read does not have the shape the field plan describes.
    PlanMismatch(String),
    /// Indicates that a row has a different number of fields than the record type.
    RowArityMismatch{row: Option<usize>, expected: usize, found: usize},
    /// Indicates that a field's text could not be converted to the field's type.
    ConversionError{field: String, row: Option<usize>, source: ConvError},
    /// Indicates that the input file could not be opened.
    FileAccessError{path: PathBuf, source: std::io::Error},
    /// Indicates that the tokenizer failed to read a row, e.g. on invalid UTF-8 or an I/O error.
    TableReadError{row: Option<usize>, source: csv::Error},
    /// Indicates a general error during deserialization
    DeserializationFailure(String),
}

fn fmt_row(row: &Option<usize>) -> String {
    row.map(|r| format!(" in row {r}")).unwrap_or_default()
}

impl Display for DError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PlanError(e) => write!(f, "Error building field plan: {e}"),
            Self::PlanMismatch(msg) => write!(f, "Record type does not match the field plan: {msg}"),
            Self::RowArityMismatch { row, expected, found } => {
                write!(f, "Expected {expected} fields{} but found {found}", fmt_row(row))
            },
            Self::ConversionError { field, row, source } => {
                write!(f, "Error reading field '{field}'{}: {source}", fmt_row(row))
            },
            Self::FileAccessError { path, source } => write!(f, "Could not open {} for reading: {source}", path.display()),
            Self::TableReadError { row, source } => write!(f, "Error reading table data{}: {source}", fmt_row(row)),
            Self::DeserializationFailure(msg) => write!(f, "Serde deserialization error: {msg}"),
        }
    }
}

impl de::Error for DError {
    fn custom<T>(msg:T) -> Self where T:Display {
        Self::DeserializationFailure(format!("{msg}"))
    }
}

impl Error for DError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PlanError(e) => Some(e),
            Self::ConversionError { source, .. } => Some(source),
            Self::FileAccessError { source, .. } => Some(source),
            Self::TableReadError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<PError> for DError {
    fn from(value: PError) -> Self {
        Self::PlanError(value)
    }
}

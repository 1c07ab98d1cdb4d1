//! Read and write whole CSV tables, one row or record at a time.
//!
//! Readers are lazy iterators over an open file (or any [`std::io::Read`]). They
//! own their input, which is closed as soon as the last row has been read, an
//! error has been returned, or the iterator is dropped, whichever comes first:
//!
//! ```no_run
//! use flatcsv::serde_common::CsvSettings;
//! use flatcsv::table::read_records;
//!
//! #[derive(Debug, serde::Deserialize)]
//! struct Person {
//!     name: String,
//!     surname: String,
//!     age: u32,
//! }
//!
//! let settings = CsvSettings::default().skip_header(true);
//! for person in read_records::<Person, _>("people.csv", &settings).unwrap() {
//!     println!("{:?}", person.unwrap());
//! }
//! ```
//!
//! Iteration stops at the first error: the error is returned once and every
//! later call to `next` gives `None`.
use std::borrow::Borrow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::de::{from_row_at, tokens_to_fields};
use crate::field_plan::FieldPlan;
use crate::ser::{to_row, write_row};
use crate::serde_common::{CsvSettings, DError, DResult, SError, SResult};
use crate::tokenize::SpaceSkipper;

/// Pulls raw rows from the tokenizer, handling header skipping and row numbers
struct RowSource<R: std::io::Read> {
    reader: Option<csv::Reader<SpaceSkipper<R>>>,
    record: csv::StringRecord,
    skip_header: bool,
    row_num: usize,
}

impl<R: std::io::Read> RowSource<R> {
    fn new(reader: R, settings: &CsvSettings) -> Self {
        Self {
            reader: Some(settings.reader(reader)),
            record: csv::StringRecord::new(),
            skip_header: settings.skip_header,
            row_num: 0,
        }
    }

    /// Drop the underlying reader; nothing more will be read.
    fn finish(&mut self) {
        if self.reader.take().is_some() {
            log::debug!("Closed CSV input after {} rows", self.row_num);
        }
    }

    fn next_row(&mut self) -> Option<DResult<(usize, Vec<String>)>> {
        loop {
            let reader = self.reader.as_mut()?;
            match reader.read_record(&mut self.record) {
                Ok(true) => {},
                Ok(false) => {
                    self.finish();
                    return None;
                },
                Err(source) => {
                    let row = Some(self.row_num + 1);
                    self.finish();
                    return Some(Err(DError::TableReadError { row, source }));
                }
            }

            self.row_num += 1;
            if self.row_num == 1 && self.skip_header {
                log::trace!("Skipping header row");
                continue;
            }

            log::trace!("Read row {} with {} fields", self.row_num, self.record.len());
            return Some(Ok((self.row_num, tokens_to_fields(&self.record))));
        }
    }
}

fn open_for_read(path: &Path) -> DResult<File> {
    let f = File::open(path)
        .map_err(|source| DError::FileAccessError { path: path.to_path_buf(), source })?;
    log::debug!("Opened {} for reading", path.display());
    Ok(f)
}


/// Iterator over the raw rows of a CSV input
pub struct RowIter<R: std::io::Read> {
    source: RowSource<R>,
}

impl<R: std::io::Read> RowIter<R> {
    /// Iterate over the rows of any reader, e.g. a [`File`] or an in-memory buffer.
    pub fn from_reader(reader: R, settings: &CsvSettings) -> Self {
        Self { source: RowSource::new(reader, settings) }
    }
}

impl<R: std::io::Read> Iterator for RowIter<R> {
    type Item = DResult<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.source.next_row().map(|res| res.map(|(_, fields)| fields))
    }
}

/// Open the file at `path` and iterate over its rows as lists of text fields.
///
/// Returns an error immediately if the file cannot be opened.
pub fn read_raw<P: AsRef<Path>>(path: P, settings: &CsvSettings) -> DResult<RowIter<File>> {
    let f = open_for_read(path.as_ref())?;
    Ok(RowIter::from_reader(f, settings))
}


/// Iterator over the rows of a CSV input, deserialized into records of type `T`
pub struct RecordIter<T, R: std::io::Read> {
    source: RowSource<R>,
    plan: FieldPlan,
    record_type: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned, R: std::io::Read> RecordIter<T, R> {
    /// Build the field plan for `T` and iterate over the records in `reader`.
    pub fn from_reader(reader: R, settings: &CsvSettings) -> DResult<Self> {
        let plan = FieldPlan::of::<T>(settings.layout())?;
        Ok(Self::with_plan(reader, plan, settings))
    }

    /// Iterate over the records in `reader` using an existing field plan for `T`.
    pub fn with_plan(reader: R, plan: FieldPlan, settings: &CsvSettings) -> Self {
        Self { source: RowSource::new(reader, settings), plan, record_type: PhantomData }
    }

    /// The field plan used to convert each row
    pub fn plan(&self) -> &FieldPlan {
        &self.plan
    }
}

impl<T: DeserializeOwned, R: std::io::Read> Iterator for RecordIter<T, R> {
    type Item = DResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let res = match self.source.next_row()? {
            Ok((row_num, fields)) => from_row_at(&fields, &self.plan, Some(row_num)),
            Err(e) => Err(e),
        };

        if res.is_err() {
            self.source.finish();
        }
        Some(res)
    }
}

/// Open the file at `path` and iterate over its rows as records of type `T`.
///
/// The field plan for `T` is built before the file is opened, so an unsupported
/// record type is reported even if the file does not exist.
pub fn read_records<T, P>(path: P, settings: &CsvSettings) -> DResult<RecordIter<T, File>>
where T: DeserializeOwned,
      P: AsRef<Path>
{
    let plan = FieldPlan::of::<T>(settings.layout())?;
    let f = open_for_read(path.as_ref())?;
    Ok(RecordIter::with_plan(f, plan, settings))
}


/// Writes records of type `T` as CSV rows to any [`Write`]r
///
/// If the settings ask for a header, it is written as soon as the writer is created.
pub struct RecordWriter<T: ?Sized, W: Write> {
    writer: W,
    plan: FieldPlan,
    settings: CsvSettings,
    nrows: usize,
    record_type: PhantomData<fn(&T)>,
}

impl<T: Serialize + DeserializeOwned, W: Write> RecordWriter<T, W> {
    /// Build the field plan for `T` and write to `writer`.
    pub fn from_writer(writer: W, settings: &CsvSettings) -> SResult<Self> {
        let plan = FieldPlan::of::<T>(settings.layout())?;
        Self::with_plan(writer, plan, settings)
    }
}

impl<T: Serialize + DeserializeOwned> RecordWriter<T, BufWriter<File>> {
    /// Create (or truncate) the file at `path` and write records to it.
    pub fn from_path<P: AsRef<Path>>(path: P, settings: &CsvSettings) -> SResult<Self> {
        let plan = FieldPlan::of::<T>(settings.layout())?;
        let path = path.as_ref();
        let f = File::create(path)
            .map_err(|source| SError::FileAccessError { path: path.to_path_buf(), source })?;
        log::debug!("Opened {} for writing", path.display());
        Self::with_plan(BufWriter::new(f), plan, settings)
    }
}

impl<T: Serialize + ?Sized, W: Write> RecordWriter<T, W> {
    /// Write to `writer` with an existing field plan.
    ///
    /// Use this for record types that only implement `Serialize`; build the
    /// plan from a type with the same fields that implements `Deserialize`.
    pub fn with_plan(writer: W, plan: FieldPlan, settings: &CsvSettings) -> SResult<Self> {
        let mut me = Self { writer, plan, settings: settings.clone(), nrows: 0, record_type: PhantomData };
        if me.settings.write_header {
            me.write_header()?;
        }
        Ok(me)
    }

    /// Write the field names as a row.
    pub fn write_header(&mut self) -> SResult<()> {
        let line = write_row(&self.plan.header(), &self.settings);
        self.writer.write_all(line.as_bytes())?;
        log::trace!("Wrote header row");
        Ok(())
    }

    /// Serialize one record and write it as a row.
    pub fn write_record(&mut self, record: &T) -> SResult<()> {
        let row = to_row(record, &self.plan)?;
        let line = write_row(&row, &self.settings);
        self.writer.write_all(line.as_bytes())?;
        self.nrows += 1;
        log::trace!("Wrote record {}", self.nrows);
        Ok(())
    }

    /// The field plan used to convert each record
    pub fn plan(&self) -> &FieldPlan {
        &self.plan
    }

    /// Number of records written so far, not counting the header
    pub fn records_written(&self) -> usize {
        self.nrows
    }

    pub fn flush(&mut self) -> SResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> SResult<W> {
        self.flush()?;
        Ok(self.writer)
    }
}

impl<T: Serialize, W: Write> RecordWriter<T, W> {
    /// Write every record from `records` in order, returning how many were written.
    ///
    /// `records` can be anything that yields records or references to them, such as
    /// a `Vec<T>`, a `&[T]`, or a generator-style iterator.
    pub fn write_all<I>(&mut self, records: I) -> SResult<usize>
    where I: IntoIterator,
          I::Item: Borrow<T>
    {
        let mut n = 0;
        for rec in records {
            self.write_record(rec.borrow())?;
            n += 1;
        }
        Ok(n)
    }
}

/// Write `records` to the file at `path`, creating or truncating it.
///
/// A header row is written first if `settings` asks for one. Returns the number of
/// records written.
///
/// ```no_run
/// use flatcsv::serde_common::CsvSettings;
/// use flatcsv::table::write_records;
///
/// #[derive(serde::Serialize, serde::Deserialize)]
/// struct Point {
///     x: f64,
///     y: f64,
/// }
///
/// let points = (0..10).map(|i| Point { x: i as f64, y: (i * i) as f64 });
/// let settings = CsvSettings::default().write_header(true);
/// write_records::<Point, _, _>(points, "points.csv", &settings).unwrap();
/// ```
pub fn write_records<T, I, P>(records: I, path: P, settings: &CsvSettings) -> SResult<usize>
where T: Serialize + DeserializeOwned,
      I: IntoIterator,
      I::Item: Borrow<T>,
      P: AsRef<Path>
{
    let mut writer = RecordWriter::<T, BufWriter<File>>::from_path(path, settings)?;
    let n = writer.write_all(records)?;
    writer.flush()?;
    log::debug!("Wrote {n} records");
    Ok(n)
}


#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Serialize};
    use stringreader::StringReader;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Person {
        name: String,
        surname: String,
        age: i32,
    }

    fn person(name: &str, surname: &str, age: i32) -> Person {
        Person { name: name.to_string(), surname: surname.to_string(), age }
    }

    #[test]
    fn test_raw_rows() -> DResult<()> {
        let input = StringReader::new("a,b,c\n\"x,y\",,z\r\n1,2");
        let rows = RowIter::from_reader(input, &CsvSettings::default())
            .collect::<DResult<Vec<_>>>()?;
        assert_eq!(rows, vec![
            vec!["a", "b", "c"],
            vec!["x,y", "", "z"],
            vec!["1", "2"],
        ]);
        Ok(())
    }

    #[test]
    fn test_records() -> DResult<()> {
        let input = StringReader::new("Andrea,Ferretti,34\nMaria,Rossi,28\n");
        let people = RecordIter::<Person, _>::from_reader(input, &CsvSettings::default())?
            .collect::<DResult<Vec<_>>>()?;
        assert_eq!(people, vec![person("Andrea", "Ferretti", 34), person("Maria", "Rossi", 28)]);
        Ok(())
    }

    #[test]
    fn test_header_skip() -> DResult<()> {
        let input = StringReader::new("name,surname,age\nAndrea,Ferretti,34\n");
        let settings = CsvSettings::default().skip_header(true);
        let mut it = RecordIter::<Person, _>::from_reader(input, &settings)?;
        assert_eq!(it.next().transpose()?, Some(person("Andrea", "Ferretti", 34)));
        assert!(it.next().is_none());

        // without skipping, the header is just a row that fails to convert
        let input = StringReader::new("name,surname,age\nAndrea,Ferretti,34\n");
        let mut it = RecordIter::<Person, _>::from_reader(input, &CsvSettings::default())?;
        assert!(matches!(it.next(), Some(Err(DError::ConversionError { row: Some(1), .. }))));
        Ok(())
    }

    #[test]
    fn test_arity_mismatch_stops_iteration() -> DResult<()> {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Six {
            a: i32,
            b: i32,
            c: i32,
            d: i32,
            e: i32,
            f: i32,
        }

        let input = StringReader::new("1,2,3,4,5,6\n1,2,3,4,5\n1,2,3,4,5,6\n");
        let mut it = RecordIter::<Six, _>::from_reader(input, &CsvSettings::default())?;
        assert!(matches!(it.next(), Some(Ok(_))));
        assert!(matches!(it.next(), Some(Err(DError::RowArityMismatch { row: Some(2), expected: 6, found: 5 }))));
        assert!(it.next().is_none());
        assert!(it.next().is_none());
        Ok(())
    }

    #[test]
    fn test_initial_space() -> DResult<()> {
        let input = StringReader::new("Andrea,  Ferretti, 34\n Sean, \"O\"\"Neil, jr\", 40\n");
        let settings = CsvSettings::default().skip_initial_space(true);
        let people = RecordIter::<Person, _>::from_reader(input, &settings)?
            .collect::<DResult<Vec<_>>>()?;
        assert_eq!(people, vec![person("Andrea", "Ferretti", 34), person("Sean", "O\"Neil, jr", 40)]);

        let input = StringReader::new("a, \" b,c\", d\n");
        let rows = RowIter::from_reader(input, &settings).collect::<DResult<Vec<_>>>()?;
        assert_eq!(rows, vec![vec!["a", " b,c", "d"]]);
        Ok(())
    }

    #[test]
    fn test_unsupported_type_fails_before_reading() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Flagged {
            name: String,
            active: bool,
        }

        let res = read_records::<Flagged, _>("/this/path/does/not/exist.csv", &CsvSettings::default());
        assert!(matches!(res, Err(DError::PlanError(_))));
    }

    #[test]
    fn test_missing_file() {
        let res = read_raw("/this/path/does/not/exist.csv", &CsvSettings::default());
        assert!(matches!(res, Err(DError::FileAccessError { .. })));

        let res = read_records::<Person, _>("/this/path/does/not/exist.csv", &CsvSettings::default());
        assert!(matches!(res, Err(DError::FileAccessError { .. })));
    }

    #[test]
    fn test_writer_header_and_quoting() -> SResult<()> {
        let settings = CsvSettings::default().write_header(true);
        let mut writer = RecordWriter::<Person, _>::from_writer(Vec::<u8>::new(), &settings)?;
        writer.write_record(&person("Andrea", "Ferretti, jr", 34))?;
        writer.write_all(vec![person("O\"Neil", "Sean", 40)])?;
        assert_eq!(writer.records_written(), 2);

        let bytes = writer.into_inner()?;
        let text = String::from_utf8(bytes).map_err(|e| SError::SerializationFailure(e.to_string()))?;
        assert_eq!(text, "name,surname,age\nAndrea,\"Ferretti, jr\",34\n\"O\"\"Neil\",Sean,40\n");
        Ok(())
    }

    #[test]
    fn test_writer_accepts_generators() -> SResult<()> {
        let mut writer = RecordWriter::<Person, _>::from_writer(Vec::<u8>::new(), &CsvSettings::default())?;
        let people = [person("a", "b", 1), person("c", "d", 2)];
        assert_eq!(writer.write_all(&people)?, 2);
        assert_eq!(writer.write_all((3..5).map(|i| person("e", "f", i)))?, 2);
        assert_eq!(writer.into_inner()?.iter().filter(|&&b| b == b'\n').count(), 4);
        Ok(())
    }

    #[test]
    fn test_serialize_only_record() -> SResult<()> {
        #[derive(Serialize)]
        struct Borrowed<'a> {
            name: &'a str,
            surname: &'a str,
            age: i32,
        }

        let plan = FieldPlan::of::<Person>(None)?;
        let mut writer = RecordWriter::with_plan(Vec::<u8>::new(), plan, &CsvSettings::default())?;
        writer.write_record(&Borrowed { name: "Andrea", surname: "Ferretti", age: 34 })?;
        assert_eq!(writer.into_inner()?, b"Andrea,Ferretti,34\n");
        Ok(())
    }

    #[test]
    fn test_file_round_trip_with_tabs() -> Result<(), Box<dyn std::error::Error>> {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Sample {
            site: String,
            #[serde(with = "crate::datetime")]
            time: NaiveDateTime,
            #[serde(rename = "co2_ppm")]
            co2: f64,
            flag: u8,
        }

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("samples.tsv");
        let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let samples: Vec<Sample> = (0..5)
            .map(|i| Sample {
                site: format!("site\t{i}"),
                time: day.and_hms_opt(i, 30, 0).unwrap(),
                co2: 410.0 + i as f64 * 0.25,
                flag: i as u8,
            })
            .collect();

        let settings = CsvSettings::default()
            .separator(b'\t')
            .write_header(true)
            .skip_header(true)
            .date_layout("%Y-%m-%dT%H:%M");
        let n = write_records::<Sample, _, _>(&samples, &path, &settings)?;
        assert_eq!(n, 5);

        let text = std::fs::read_to_string(&path)?;
        assert!(text.starts_with("site\ttime\tco2_ppm\tflag\n\"site\t0\"\t2020-01-01T00:30\t410.0\t0\n"), "{text}");

        let back = read_records::<Sample, _>(&path, &settings)?.collect::<DResult<Vec<_>>>()?;
        assert_eq!(back, samples);

        let raw = read_raw(&path, &settings)?.collect::<DResult<Vec<_>>>()?;
        assert_eq!(raw.len(), 5);
        assert_eq!(raw[4], vec!["site\t4", "2020-01-01T04:30", "411.0", "4"]);
        Ok(())
    }

    #[test]
    fn test_escape_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("escaped.csv");
        let people = vec![person("say \"hi\"", "back\\slash, etc", -1)];

        let settings = CsvSettings::default().escape(Some(b'\\'));
        write_records::<Person, _, _>(&people, &path, &settings)?;
        let back = read_records::<Person, _>(&path, &settings)?.collect::<DResult<Vec<_>>>()?;
        assert_eq!(back, people);
        Ok(())
    }

    #[test]
    fn test_empty_single_field_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Note {
            text: String,
        }

        let notes: Vec<Note> = ["a", "", "b"].iter().map(|t| Note { text: t.to_string() }).collect();
        let mut writer = RecordWriter::<Note, _>::from_writer(Vec::<u8>::new(), &CsvSettings::default())?;
        writer.write_all(&notes)?;
        let bytes = writer.into_inner()?;
        assert_eq!(bytes, b"a\n\"\"\nb\n");

        let back = RecordIter::<Note, _>::from_reader(bytes.as_slice(), &CsvSettings::default())?
            .collect::<DResult<Vec<_>>>()?;
        assert_eq!(back, notes);
        Ok(())
    }

    #[test]
    fn test_early_drop_releases_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("people.csv");
        let people: Vec<Person> = (0..100).map(|i| person("a", "b", i)).collect();
        write_records::<Person, _, _>(&people, &path, &CsvSettings::default())?;

        let first_two = read_records::<Person, _>(&path, &CsvSettings::default())?
            .take(2)
            .collect::<DResult<Vec<_>>>()?;
        assert_eq!(first_two, people[..2]);

        // the file is no longer held open, so it can be replaced
        write_records::<Person, _, _>(&people[..1], &path, &CsvSettings::default())?;
        assert_eq!(read_records::<Person, _>(&path, &CsvSettings::default())?.count(), 1);
        Ok(())
    }
}

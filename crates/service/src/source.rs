//! Lazy record source over the persisted dataset
//!
//! The dataset is a sequence of JSON objects with no enclosing array:
//!
//! ```text
//! {"Name": "server1", "Datacenter": "aa"}
//! {"Name": "server40", "Datacenter": "ab"}
//! ```
//!
//! `RecordSource` decodes one object per `next()` call, so a scan holds a
//! single record in memory no matter how large the file is. End of file
//! ends the sequence; a malformed record ends it with one `DecodeFailure`.
//!
//! Field names match case-insensitively (`name`, `NAME` and `Name` are the
//! same field) and the last occurrence wins. A `null` value leaves the field
//! as it was, and a `null` record is an empty record. Unknown fields are
//! ignored.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::de::IoRead;
use serde_json::{Deserializer, StreamDeserializer};

use crate::error::{Result, StreamError};

/// One persisted server entry
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerRecord {
    /// Server name (not guaranteed unique)
    pub name: String,
    /// Datacenter the server lives in
    pub datacenter: String,
}

impl ServerRecord {
    /// Create a record
    pub fn new(name: impl Into<String>, datacenter: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            datacenter: datacenter.into(),
        }
    }
}

/// Record field, matched without regard to ASCII case
enum Field {
    Name,
    Datacenter,
    Other,
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        struct FieldVisitor;

        impl Visitor<'_> for FieldVisitor {
            type Value = Field;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a field name")
            }

            fn visit_str<E: de::Error>(self, key: &str) -> std::result::Result<Field, E> {
                Ok(if key.eq_ignore_ascii_case("name") {
                    Field::Name
                } else if key.eq_ignore_ascii_case("datacenter") {
                    Field::Datacenter
                } else {
                    Field::Other
                })
            }
        }

        deserializer.deserialize_identifier(FieldVisitor)
    }
}

impl<'de> Deserialize<'de> for ServerRecord {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = ServerRecord;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a server record object")
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<ServerRecord, E> {
                Ok(ServerRecord::default())
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<ServerRecord, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut record = ServerRecord::default();

                while let Some(field) = map.next_key::<Field>()? {
                    let slot = match field {
                        Field::Name => &mut record.name,
                        Field::Datacenter => &mut record.datacenter,
                        Field::Other => {
                            map.next_value::<IgnoredAny>()?;
                            continue;
                        }
                    };
                    if let Some(value) = map.next_value::<Option<String>>()? {
                        *slot = value;
                    }
                }

                Ok(record)
            }
        }

        deserializer.deserialize_any(RecordVisitor)
    }
}

/// Forward-only decoder over a dataset
///
/// Not restartable. Dropping the source closes the underlying file.
pub struct RecordSource<R: Read> {
    records: StreamDeserializer<'static, IoRead<R>, ServerRecord>,
    /// Records decoded so far
    decoded: u64,
    /// Set after the first decode error
    failed: bool,
}

impl RecordSource<BufReader<File>> {
    /// Open the dataset file read-only
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| StreamError::SourceUnavailable {
            path: path.display().to_string(),
            source,
        })?;

        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: Read> RecordSource<R> {
    /// Decode records from any reader
    pub fn from_reader(reader: R) -> Self {
        Self {
            records: Deserializer::from_reader(reader).into_iter(),
            decoded: 0,
            failed: false,
        }
    }

    /// Number of records decoded so far
    pub fn decoded(&self) -> u64 {
        self.decoded
    }
}

impl<R: Read> Iterator for RecordSource<R> {
    type Item = Result<ServerRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.records.next()? {
            Ok(record) => {
                self.decoded += 1;
                Some(Ok(record))
            }
            Err(source) => {
                self.failed = true;
                Some(Err(StreamError::DecodeFailure {
                    record: self.decoded + 1,
                    source,
                }))
            }
        }
    }
}

impl<R: Read> std::fmt::Debug for RecordSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordSource")
            .field("decoded", &self.decoded)
            .field("failed", &self.failed)
            .finish()
    }
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;

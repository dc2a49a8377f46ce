use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::marker::PhantomData;
use std::path::Path;

use super::SensorSource;
use crate::error::{Result, SurveyError};

/// Replays a recorded stream: one JSON reading per line.
///
/// Blank lines are skipped. A line that does not parse ends the stream
/// with a malformed-input error.
pub struct ReplaySource<R> {
    sensor: &'static str,
    lines: Box<dyn BufRead + Send>,
    line_no: usize,
    _reading: PhantomData<fn() -> R>,
}

impl<R> ReplaySource<R> {
    /// Open a recording. Access refused by the OS maps to `PermissionDenied`.
    pub fn open(sensor: &'static str, path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => SurveyError::PermissionDenied { sensor },
            _ => SurveyError::Io(e),
        })?;
        Ok(Self::from_reader(sensor, BufReader::new(file)))
    }

    pub fn from_reader(sensor: &'static str, reader: impl BufRead + Send + 'static) -> Self {
        Self {
            sensor,
            lines: Box::new(reader),
            line_no: 0,
            _reading: PhantomData,
        }
    }
}

impl<R: DeserializeOwned + Send + 'static> SensorSource for ReplaySource<R> {
    type Reading = R;

    fn name(&self) -> &'static str {
        self.sensor
    }

    fn next_reading(&mut self) -> Result<Option<R>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.lines.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return serde_json::from_str(trimmed).map(Some).map_err(|e| {
                SurveyError::MalformedResponse {
                    service: self.sensor,
                    reason: format!("line {}: {}", self.line_no, e),
                }
            });
        }
    }
}

/// Source backed by any iterator, handy for scripted readings
pub struct IterSource<I> {
    sensor: &'static str,
    readings: I,
}

impl<I> IterSource<I> {
    pub fn new<T>(sensor: &'static str, readings: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            sensor,
            readings: readings.into_iter(),
        }
    }
}

impl<I> SensorSource for IterSource<I>
where
    I: Iterator + Send,
    I::Item: Send + 'static,
{
    type Reading = I::Item;

    fn name(&self) -> &'static str {
        self.sensor
    }

    fn next_reading(&mut self) -> Result<Option<I::Item>> {
        Ok(self.readings.next())
    }
}

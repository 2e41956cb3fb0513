//! Analysis records
//!
//! One flat row per flock and generation: run id, generation, one weight
//! column per rule kind and the fitness.  Written as JSON Lines or as CSV
//! with the same column names; a rule the flock lacks is `null` in JSON and
//! an empty CSV cell.

use crate::core::SimError;
use crate::swarm::rule::{RuleKind, RuleSet};
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    #[serde(rename = "Obs")]
    pub observation: u32,
    #[serde(rename = "Gen")]
    pub generation: u32,
    pub member: usize,
    #[serde(rename = "Alignment")]
    pub alignment: Option<f32>,
    #[serde(rename = "Cohesion")]
    pub cohesion: Option<f32>,
    #[serde(rename = "Separation")]
    pub separation: Option<f32>,
    #[serde(rename = "GoToWater")]
    pub seek_water: Option<f32>,
    #[serde(rename = "GoToFire")]
    pub seek_fire: Option<f32>,
    pub fitness: f64,
}

impl GenerationRecord {
    pub fn from_rules(
        observation: u32,
        generation: u32,
        member: usize,
        rules: &RuleSet,
        fitness: f64,
    ) -> Self {
        GenerationRecord {
            observation,
            generation,
            member,
            alignment: rules.weight(RuleKind::Alignment),
            cohesion: rules.weight(RuleKind::Cohesion),
            separation: rules.weight(RuleKind::Separation),
            seek_water: rules.weight(RuleKind::SeekWater),
            seek_fire: rules.weight(RuleKind::SeekFire),
            fitness,
        }
    }

    pub fn weight(&self, kind: RuleKind) -> Option<f32> {
        match kind {
            RuleKind::Alignment => self.alignment,
            RuleKind::Cohesion => self.cohesion,
            RuleKind::Separation => self.separation,
            RuleKind::SeekWater => self.seek_water,
            RuleKind::SeekFire => self.seek_fire,
        }
    }
}

/// Column order of the CSV output.
pub const CSV_COLUMNS: [&str; 9] = [
    "Obs",
    "Gen",
    "member",
    "Alignment",
    "Cohesion",
    "Separation",
    "GoToWater",
    "GoToFire",
    "fitness",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordFormat {
    JsonLines,
    /// Header row before the first record.
    Csv,
}

/// Streams records to any writer, one record per line.
pub struct RecordWriter<W: Write> {
    inner: W,
    format: RecordFormat,
    written: usize,
}

fn csv_weight(weight: Option<f32>) -> String {
    weight.map_or_else(String::new, |w| w.to_string())
}

impl<W: Write> RecordWriter<W> {
    /// JSON Lines writer.
    pub fn new(inner: W) -> Self {
        Self::with_format(inner, RecordFormat::JsonLines)
    }

    pub fn csv(inner: W) -> Self {
        Self::with_format(inner, RecordFormat::Csv)
    }

    pub fn with_format(inner: W, format: RecordFormat) -> Self {
        RecordWriter {
            inner,
            format,
            written: 0,
        }
    }

    pub fn format(&self) -> RecordFormat {
        self.format
    }

    pub fn write(&mut self, record: &GenerationRecord) -> Result<(), SimError> {
        match self.format {
            RecordFormat::JsonLines => {
                serde_json::to_writer(&mut self.inner, record)?;
                self.inner.write_all(b"\n")?;
            }
            RecordFormat::Csv => {
                if self.written == 0 {
                    writeln!(self.inner, "{}", CSV_COLUMNS.join(","))?;
                }
                writeln!(
                    self.inner,
                    "{},{},{},{},{},{},{},{},{}",
                    record.observation,
                    record.generation,
                    record.member,
                    csv_weight(record.alignment),
                    csv_weight(record.cohesion),
                    csv_weight(record.separation),
                    csv_weight(record.seek_water),
                    csv_weight(record.seek_fire),
                    record.fitness
                )?;
            }
        }
        self.written += 1;
        Ok(())
    }

    pub fn write_all(&mut self, records: &[GenerationRecord]) -> Result<(), SimError> {
        for record in records {
            self.write(record)?;
        }
        self.inner.flush()?;
        Ok(())
    }

    /// Records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

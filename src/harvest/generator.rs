//! Synthetic record source.
//!
//! Emits a configured number of dataset records whose facet values cycle through
//! fixed vocabularies, so the pipeline and the index can be exercised without any
//! remote repository.

use crate::record::Record;

const PROJECTS: &[&str] = &["AIRS", "MLS", "IPCC5"];
const MODELS: &[&str] = &["CCSM", "PCM", "BCM"];
const EXPERIMENTS: &[&str] = &["commit", "amip", "picntrl"];
const FREQUENCIES: &[&str] = &["Monthly", "Daily", "Hourly"];
const REALMS: &[&str] = &["Ocean", "Atmosphere", "Land", "Sea Ice"];
const VARIABLES: &[&str] = &[
    "Downwelling Longwave Radiance in Air",
    "Ocean Integral of Sea Water Temperature wrt Depth",
];

pub const DEFAULT_GENERATED_RECORDS: usize = 10;

#[derive(Debug, Clone)]
pub struct RecordGenerator {
    num_records: usize,
}

impl RecordGenerator {
    pub fn new(num_records: usize) -> Self {
        Self { num_records }
    }

    pub fn num_records(&self) -> usize {
        self.num_records
    }

    /// The `n`-th generated record (zero based).
    pub fn record(n: usize) -> Record {
        let cycle = |values: &[&str]| values[n % values.len()].to_string();

        Record::new(n.to_string())
            .with_field("title", format!("Record #{}", n))
            .with_field("name", format!("Record #{}", n))
            .with_field(
                "description",
                format!("This is the record #{} long description", n),
            )
            .with_field("type", "Dataset")
            .with_field("url", format!("http://mysite.com/records/id={}", n))
            .with_field("project", cycle(PROJECTS))
            .with_field("model", cycle(MODELS))
            .with_field("experiment", cycle(EXPERIMENTS))
            .with_field("frequency", cycle(FREQUENCIES))
            .with_field("realm", cycle(REALMS))
            .with_field("variable", cycle(VARIABLES))
    }

    pub fn records(&self) -> impl Iterator<Item = Record> {
        (0..self.num_records).map(Self::record)
    }
}

impl Default for RecordGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_GENERATED_RECORDS)
    }
}

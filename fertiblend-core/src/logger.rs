use crate::{error::FertiblendError, verification::VerificationReport};
use csv::Writer;
use serde::Serialize;
use std::fs;
use std::io;

#[derive(Debug, Serialize)]
struct LogEntry<'a> {
    element: &'a str,
    target_mg_l: f64,
    water_mg_l: f64,
    achieved_mg_l: f64,
    deviation_percent: f64,
    status: String,
    primary_diagnosis: &'a str,
    findings_json: String,
}

/// Writes one CSV row per verified element.
pub struct VerificationLogger {
    path: String,
    writer: Writer<fs::File>,
}

impl VerificationLogger {
    pub fn new(path: &str) -> Result<Self, io::Error> {
        let writer = Writer::from_path(path)?;
        Ok(Self {
            path: path.to_string(),
            writer,
        })
    }

    pub fn log_report(&mut self, report: &VerificationReport) -> Result<(), FertiblendError> {
        for row in &report.elements {
            let diagnosis = report.diagnosis(&row.element);
            let primary_diagnosis = diagnosis.map_or("", |d| d.primary.code());
            let findings_json = match diagnosis {
                Some(d) => serde_json::to_string(&d.findings)?,
                None => "[]".to_string(),
            };
            let entry = LogEntry {
                element: &row.element,
                target_mg_l: row.target,
                water_mg_l: row.water,
                achieved_mg_l: row.achieved,
                deviation_percent: row.deviation_percent,
                status: row.status.to_string(),
                primary_diagnosis,
                findings_json,
            };
            self.writer
                .serialize(entry)
                .map_err(|e| FertiblendError::CsvError(self.path.clone(), e))?;
        }
        self.writer
            .flush()
            .map_err(|e| FertiblendError::FileIO(self.path.clone(), e))?;
        Ok(())
    }
}

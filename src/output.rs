// src/output.rs

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use log::info;

use crate::error::Result;
use crate::types::{AnalysisResult, DistanceMatrix, LabelMatrix, TrajectoryGroups};

pub const LABEL_MATRIX_FILE: &str = "gene_community_matrix.csv";
pub const DISTANCE_MATRIX_FILE: &str = "distance_matrix.csv";
pub const GROUPS_FILE: &str = "l_constant.json";

/// Paths of the files written by [`write_results`].
#[derive(Debug, Clone)]
pub struct WrittenResults {
    pub label_matrix: PathBuf,
    pub distance_matrix: PathBuf,
    pub groups: PathBuf,
}

pub fn write_results(dir: &Path, result: &AnalysisResult) -> Result<WrittenResults> {
    fs::create_dir_all(dir)?;
    let written = WrittenResults {
        label_matrix: dir.join(LABEL_MATRIX_FILE),
        distance_matrix: dir.join(DISTANCE_MATRIX_FILE),
        groups: dir.join(GROUPS_FILE),
    };

    write_label_matrix(&written.label_matrix, &result.gene_community_matrix)?;
    write_distance_matrix(&written.distance_matrix, &result.distance_matrix)?;
    write_groups(&written.groups, &result.l_constant)?;

    info!("Results written to {:?}", dir);
    Ok(written)
}

/// Header `entity,<resolution>...`, one row per entity.
pub fn write_label_matrix(path: &Path, matrix: &LabelMatrix) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = Vec::with_capacity(matrix.ncols() + 1);
    header.push("entity".to_string());
    header.extend(matrix.columns().iter().cloned());
    writer.write_record(&header)?;

    for (entity, row) in matrix.entities().iter().zip(matrix.rows()) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(entity.clone());
        record.extend(row.iter().map(|l| l.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Square matrix with entity ids as both header and first column.
pub fn write_distance_matrix(path: &Path, matrix: &DistanceMatrix) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = Vec::with_capacity(matrix.len() + 1);
    header.push("entity".to_string());
    header.extend(matrix.entities().iter().cloned());
    writer.write_record(&header)?;

    for (i, entity) in matrix.entities().iter().enumerate() {
        let mut record = Vec::with_capacity(matrix.len() + 1);
        record.push(entity.clone());
        record.extend(matrix.row(i).iter().map(|d| d.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_groups(path: &Path, groups: &TrajectoryGroups) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, groups)?;
    Ok(())
}

/// The whole bundle as one JSON document.
pub fn write_json(path: &Path, result: &AnalysisResult) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, result)?;
    Ok(())
}

pub fn read_json(path: &Path) -> Result<AnalysisResult> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

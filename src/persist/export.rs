//! CSV export of the joined model listing.

use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;
use tracing::info;

use super::PersistError;
use crate::query::ModelDetail;

const HEADER: [&str; 11] = [
    "model_id",
    "model_name",
    "series_id",
    "series_name",
    "price",
    "range_km",
    "energy_type",
    "body_type",
    "seats",
    "launch_year",
    "techs",
];

/// Writes one CSV row per model; technology names are joined with `|`.
///
/// Returns the number of data rows written.
pub fn write_models_csv<W: Write>(sink: W, models: &[ModelDetail]) -> Result<u64, PersistError> {
    let mut writer = WriterBuilder::new().from_writer(sink);
    writer.write_record(HEADER)?;
    for detail in models {
        let model = &detail.model;
        writer.write_record([
            model.id.to_string(),
            model.name.clone(),
            model.series_id.to_string(),
            detail.series_name.clone(),
            model.price.to_string(),
            model.range_km.to_string(),
            model.energy_type.clone(),
            model.body_type.clone(),
            model.seats.to_string(),
            model.launch_year.clone(),
            detail.techs.join("|"),
        ])?;
    }
    writer.flush()?;
    Ok(models.len() as u64)
}

/// [`write_models_csv`] into a file at `path`, replacing it.
pub fn export_models_csv(path: &Path, models: &[ModelDetail]) -> Result<u64, PersistError> {
    let file = std::fs::File::create(path).map_err(|source| PersistError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = write_models_csv(file, models)?;
    info!(path = %path.display(), rows, "models exported");
    Ok(rows)
}

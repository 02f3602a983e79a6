//! Sectioned, comma-separated text format.
//!
//! ```text
//! # comment
//! [SERIES]
//! id,name,intro
//! [TECH]
//! id,name,intro
//! [MODEL]
//! id,name,series_id,price,range_km,energy_type,body_type,seats,launch_year[,tech|tech]
//! [MODEL_TECH]
//! model_id,tech_id
//! ```
//!
//! Rows are CSV records read and written with the `csv` crate, so any text
//! column may contain commas, quotes, `|` or line breaks once quoted. Text
//! is kept verbatim; only numeric columns are trimmed. An unquoted comma in
//! an intro still survives because the intro is the last column. The
//! optional tenth model column lists tech ids separated by `|` and becomes
//! association rows.

use std::str::FromStr;

use csv::{QuoteStyle, ReaderBuilder, StringRecord, Trim, WriterBuilder};
use tracing::warn;

use crate::catalog::{Dataset, Model, Series, Tech};

/// Decoding failure at a specific line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line number.
    pub line: usize,
    /// What went wrong.
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Series,
    Tech,
    Model,
    ModelTech,
}

impl Section {
    fn from_header(header: &str) -> Option<Self> {
        match header {
            "[SERIES]" => Some(Section::Series),
            "[TECH]" => Some(Section::Tech),
            "[MODEL]" => Some(Section::Model),
            "[MODEL_TECH]" => Some(Section::ModelTech),
            _ => None,
        }
    }

    fn header(self) -> &'static str {
        match self {
            Section::Series => "[SERIES]",
            Section::Tech => "[TECH]",
            Section::Model => "[MODEL]",
            Section::ModelTech => "[MODEL_TECH]",
        }
    }

    fn min_fields(self) -> usize {
        match self {
            Section::Series | Section::Tech => 2,
            Section::Model => 9,
            Section::ModelTech => 2,
        }
    }
}

fn header_of(record: &StringRecord) -> Option<&str> {
    if record.len() != 1 {
        return None;
    }
    let field = record.get(0)?.trim();
    (field.starts_with('[') && field.ends_with(']')).then_some(field)
}

fn line_of(record: &StringRecord) -> usize {
    record
        .position()
        .map_or(0, |pos| usize::try_from(pos.line()).unwrap_or(usize::MAX))
}

/// Decodes a whole file.
///
/// Rows with too few fields, rows outside a known section and unknown
/// section headers are skipped with a warning; malformed numbers fail.
pub fn parse(text: &str) -> Result<Dataset, ParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::None)
        .comment(Some(b'#'))
        .from_reader(text.as_bytes());

    let mut data = Dataset::default();
    let mut section: Option<Section> = None;
    for result in reader.records() {
        let record = result.map_err(|err| ParseError {
            line: err
                .position()
                .map_or(0, |pos| usize::try_from(pos.line()).unwrap_or(usize::MAX)),
            message: err.to_string(),
        })?;
        let line_no = line_of(&record);
        if let Some(header) = header_of(&record) {
            section = Section::from_header(header);
            if section.is_none() {
                warn!(line = line_no, header, "unknown section; skipping its rows");
            }
            continue;
        }
        let Some(current) = section else {
            warn!(line = line_no, "row outside a known section; skipped");
            continue;
        };
        if record.len() < current.min_fields() {
            warn!(
                line = line_no,
                fields = record.len(),
                expected = current.min_fields(),
                "row has too few fields; skipped"
            );
            continue;
        }
        let cursor = Fields {
            line: line_no,
            record: &record,
        };
        match current {
            Section::Series => data.series.push(Series {
                id: cursor.number(0, "series id")?,
                name: cursor.text(1),
                intro: cursor.rest(2),
            }),
            Section::Tech => data.techs.push(Tech {
                id: cursor.number(0, "tech id")?,
                name: cursor.text(1),
                intro: cursor.rest(2),
            }),
            Section::Model => {
                let model = Model {
                    id: cursor.number(0, "model id")?,
                    name: cursor.text(1),
                    series_id: cursor.number(2, "series_id")?,
                    price: cursor.number(3, "price")?,
                    range_km: cursor.number(4, "range_km")?,
                    energy_type: cursor.text(5),
                    body_type: cursor.text(6),
                    seats: cursor.number(7, "seats")?,
                    launch_year: cursor.text(8),
                };
                if let Some(list) = record.get(9) {
                    for token in list.split('|').map(str::trim).filter(|t| !t.is_empty()) {
                        let tech_id = token.parse().map_err(|_| ParseError {
                            line: line_no,
                            message: format!("invalid tech id '{token}'"),
                        })?;
                        data.associations.push((model.id, tech_id));
                    }
                }
                data.models.push(model);
            }
            Section::ModelTech => data.associations.push((
                cursor.number(0, "model_id")?,
                cursor.number(1, "tech_id")?,
            )),
        }
    }
    Ok(data)
}

struct Fields<'a> {
    line: usize,
    record: &'a StringRecord,
}

impl Fields<'_> {
    fn number<T: FromStr>(&self, index: usize, what: &str) -> Result<T, ParseError> {
        let raw = self.record.get(index).unwrap_or_default().trim();
        raw.parse().map_err(|_| ParseError {
            line: self.line,
            message: format!("invalid {what} '{raw}'"),
        })
    }

    fn text(&self, index: usize) -> String {
        self.record.get(index).unwrap_or_default().to_string()
    }

    fn rest(&self, from: usize) -> String {
        self.record.iter().skip(from).collect::<Vec<_>>().join(",")
    }
}

/// Encodes a dataset. Associations go to `[MODEL_TECH]`.
pub fn render(data: &Dataset) -> Result<String, csv::Error> {
    let mut out = String::new();
    out.push_str("# dynasty catalog data file\n");
    out.push_str("# [SERIES] id,name,intro\n");
    out.push_str("# [TECH] id,name,intro\n");
    out.push_str(
        "# [MODEL] id,name,series_id,price,range_km,energy_type,body_type,seats,launch_year\n",
    );
    out.push_str("# [MODEL_TECH] model_id,tech_id\n");

    let series = data
        .series
        .iter()
        .map(|row| vec![row.id.to_string(), row.name.clone(), row.intro.clone()]);
    write_section(&mut out, Section::Series, series)?;

    let techs = data
        .techs
        .iter()
        .map(|row| vec![row.id.to_string(), row.name.clone(), row.intro.clone()]);
    write_section(&mut out, Section::Tech, techs)?;

    let models = data.models.iter().map(|row| {
        vec![
            row.id.to_string(),
            row.name.clone(),
            row.series_id.to_string(),
            row.price.to_string(),
            row.range_km.to_string(),
            row.energy_type.clone(),
            row.body_type.clone(),
            row.seats.to_string(),
            row.launch_year.clone(),
        ]
    });
    write_section(&mut out, Section::Model, models)?;

    let associations = data
        .associations
        .iter()
        .map(|(model_id, tech_id)| vec![model_id.to_string(), tech_id.to_string()]);
    write_section(&mut out, Section::ModelTech, associations)?;
    Ok(out)
}

fn write_section<I>(out: &mut String, section: Section, rows: I) -> Result<(), csv::Error>
where
    I: IntoIterator<Item = Vec<String>>,
{
    out.push('\n');
    out.push_str(section.header());
    out.push('\n');
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(&row)?;
    }
    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    out.push_str(&String::from_utf8_lossy(&bytes));
    Ok(())
}

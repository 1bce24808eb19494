use crate::io::source::DataSource;
use crate::types::{VegError, VegResult};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Which lookup-table columns hold the category code and its label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupColumns {
    pub code: String,
    pub label: String,
}

impl Default for LookupColumns {
    fn default() -> Self {
        // Corine Land Cover raster legend
        Self {
            code: "GRID_CODE".to_string(),
            label: "LABEL3".to_string(),
        }
    }
}

/// One unparsed lookup-table row
#[derive(Debug, Clone, PartialEq)]
pub struct LookupRow {
    /// 1-based line in the source file
    pub line: u64,
    pub code: String,
    pub label: String,
}

/// Raw rows of a code -> label lookup table
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    rows: Vec<LookupRow>,
}

impl LookupTable {
    pub fn from_rows(rows: Vec<LookupRow>) -> Self {
        Self { rows }
    }

    /// Parse a CSV table with a header line
    pub fn from_csv<R: Read>(reader: R, columns: &LookupColumns) -> VegResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    VegError::LookupTable(format!(
                        "column '{}' not found in header [{}]",
                        name,
                        headers.iter().collect::<Vec<_>>().join(", ")
                    ))
                })
        };
        let code_idx = find(columns.code.as_str())?;
        let label_idx = find(columns.label.as_str())?;

        let mut rows = Vec::new();
        for (n, record) in csv_reader.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("Skipping unreadable lookup record {}: {}", n + 1, e);
                    continue;
                }
            };
            let line = record.position().map(|p| p.line()).unwrap_or(n as u64 + 2);
            rows.push(LookupRow {
                line,
                code: record.get(code_idx).unwrap_or_default().to_string(),
                label: record.get(label_idx).unwrap_or_default().to_string(),
            });
        }

        log::debug!("Lookup table: {} rows", rows.len());
        Ok(Self { rows })
    }

    /// Fetch `name` from a data source and parse it as CSV
    pub fn fetch(source: &dyn DataSource, name: &str, columns: &LookupColumns) -> VegResult<Self> {
        log::info!("Loading lookup table '{}'", name);
        let content = source.fetch(name)?;
        Self::from_csv(content.as_slice(), columns)
    }

    pub fn rows(&self) -> &[LookupRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::source::StaticSource;

    const LEGEND: &str = "GRID_CODE,CLC_CODE,LABEL1,LABEL2,LABEL3,RGB\n\
1,111,Artificial surfaces,Urban fabric,Continuous urban fabric,230-000-077\n\
23,311,Forest and semi natural areas,Forests,Broad-leaved forest,128-255-000\n\
48,999,NODATA,NODATA,NODATA,\n";

    #[test]
    fn test_corine_legend_columns() {
        let table = LookupTable::from_csv(LEGEND.as_bytes(), &LookupColumns::default()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[1].code, "23");
        assert_eq!(table.rows()[1].label, "Broad-leaved forest");
        assert_eq!(table.rows()[1].line, 3);
    }

    #[test]
    fn test_custom_columns_and_missing_column() {
        let columns = LookupColumns {
            code: "clc_code".to_string(),
            label: "label2".to_string(),
        };
        let table = LookupTable::from_csv(LEGEND.as_bytes(), &columns).unwrap();
        assert_eq!(table.rows()[0].code, "111");
        assert_eq!(table.rows()[0].label, "Urban fabric");

        let columns = LookupColumns {
            code: "VALUE".to_string(),
            label: "LABEL3".to_string(),
        };
        assert!(matches!(
            LookupTable::from_csv(LEGEND.as_bytes(), &columns),
            Err(VegError::LookupTable(_))
        ));
    }

    #[test]
    fn test_short_rows_keep_empty_fields() {
        let table = LookupTable::from_csv(
            "GRID_CODE,LABEL3\n5\n6,Sport and leisure facilities\n".as_bytes(),
            &LookupColumns::default(),
        )
        .unwrap();
        assert_eq!(table.rows()[0].label, "");
        assert_eq!(table.rows()[1].label, "Sport and leisure facilities");
    }

    #[test]
    fn test_fetch_from_source() {
        let source = StaticSource::new().with("clc_legend.csv", LEGEND);
        let table = LookupTable::fetch(&source, "clc_legend.csv", &LookupColumns::default()).unwrap();
        assert_eq!(table.len(), 3);
    }
}

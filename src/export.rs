use std::path::Path;

use anyhow::{Context, Result};

use crate::record::{Field, Record};

/// Write records as UTF-8 CSV: one header row in the fixed column order,
/// then one row per record. Absent fields become empty cells.
pub fn write_csv(path: &Path, records: &[Record]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(Field::ALL.iter().map(|f| f.name()))?;
    for record in records {
        writer.write_record(Field::ALL.iter().map(|f| record.get(*f).to_string()))?;
    }

    writer.flush()?;
    Ok(())
}

// ── Tests ──

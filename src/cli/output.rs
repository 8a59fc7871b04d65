//! Output formatting for schemas, tables and registries.

use std::io::Write;

use clap::ValueEnum;
use kntable_arrow::KnimeTable;
use kntable_core::wire::to_knime_value;
use kntable_core::{ExtensionRegistry, Schema};
use serde_json::json;

use crate::error::Result;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    Text,
    /// Wire schema JSON
    Json,
}

/// Formats inspection results for output.
pub struct OutputFormatter<'r> {
    format: OutputFormat,
    registry: &'r ExtensionRegistry,
}

impl<'r> OutputFormatter<'r> {
    /// Create a new formatter with the specified format.
    pub fn new(format: OutputFormat, registry: &'r ExtensionRegistry) -> Self {
        Self { format, registry }
    }

    /// Write a schema.
    pub fn write_schema<W: Write>(&self, schema: &Schema, writer: &mut W) -> Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(writer, "{schema}")?,
            OutputFormat::Json => {
                let value = to_knime_value(schema, self.registry)?;
                writeln!(writer, "{value}")?;
            }
        }
        Ok(())
    }

    /// Write a table's logical schema with its batch and row counts.
    pub fn write_table<W: Write>(&self, table: &KnimeTable, writer: &mut W) -> Result<()> {
        match self.format {
            OutputFormat::Text => {
                writeln!(writer, "{}", table.schema())?;
                writeln!(writer, "batches: {}", table.num_batches())?;
                writeln!(writer, "rows: {}", table.num_rows())?;
            }
            OutputFormat::Json => {
                let value = json!({
                    "schema": to_knime_value(table.schema(), self.registry)?,
                    "batches": table.num_batches(),
                    "rows": table.num_rows(),
                });
                writeln!(writer, "{value}")?;
            }
        }
        Ok(())
    }

    /// Write the registered logical types in registration order.
    pub fn write_types<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self.format {
            OutputFormat::Text => {
                use comfy_table::{Cell, Table};

                let mut table = Table::new();
                table.set_header(vec![
                    Cell::new("Value type"),
                    Cell::new("Storage"),
                    Cell::new("Dict"),
                    Cell::new("Logical type"),
                ]);
                for converter in self.registry.iter() {
                    table.add_row(vec![
                        Cell::new(converter.value_type().short_name()),
                        Cell::new(converter.storage_type()),
                        Cell::new(converter.dict_encoding().map_or("", |k| k.as_trait())),
                        Cell::new(converter.logical_type()),
                    ]);
                }
                writeln!(writer, "{table}")?;
            }
            OutputFormat::Json => {
                let types: Vec<_> = self
                    .registry
                    .iter()
                    .map(|c| {
                        json!({
                            "logical_type": c.logical_type(),
                            "value_type": c.value_type().name(),
                            "storage": c.storage_type().to_string(),
                            "dict_encoding": c.dict_encoding().map(|k| k.as_trait()),
                        })
                    })
                    .collect();
                writeln!(writer, "{}", serde_json::Value::Array(types))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kntable_core::types::{int32, string};

    fn render(format: OutputFormat, schema: &Schema) -> String {
        let registry = ExtensionRegistry::new();
        let mut out = Vec::new();
        OutputFormatter::new(format, &registry)
            .write_schema(schema, &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_text_schema() {
        let schema = Schema::from_types([string(), int32()], ["<RowID>", "n"]).unwrap();
        let text = render(OutputFormat::Text, &schema);
        assert!(text.starts_with("Schema<"));
        assert!(text.contains("n"));
    }

    #[test]
    fn test_json_schema_is_wire_format() {
        let schema = Schema::from_types([string(), int32()], ["<RowID>", "n"]).unwrap();
        let text = render(OutputFormat::Json, &schema);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["columnNames"], json!(["<RowID>", "n"]));
    }

    #[test]
    fn test_types_listing() {
        let registry = ExtensionRegistry::with_builtins().unwrap();
        let mut out = Vec::new();
        OutputFormatter::new(OutputFormat::Text, &registry)
            .write_types(&mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Value type"));
        for converter in registry.iter() {
            assert!(text.contains(&converter.value_type().short_name()));
        }
        assert!(text.contains("LocalDateValueFactory"));
    }
}

use clap::Subcommand;

use charsheet_core::{
    ColumnSchema, CredentialProvider, FieldError, Record, RecordHandle, RecordSession,
    RecordStore, Role, SheetsTransport,
};

use super::OutputFormat;

#[derive(Subcommand)]
pub enum SheetCommand {
    /// List character sheets
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Create a character sheet from the template
    Create {
        /// Character name
        name: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a character sheet
    Show {
        /// Spreadsheet ID or character name
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Set an editable value and save it
    Set {
        /// Spreadsheet ID or character name
        identifier: String,

        /// Row label, e.g. "Level"
        label: String,

        /// New value (empty string clears the cell)
        value: String,

        /// Editable field key (defaults to the first editable column)
        #[arg(long)]
        field: Option<String>,
    },

    /// Show the column layout
    Schema {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl SheetCommand {
    pub async fn run<T: SheetsTransport>(
        &self,
        store: &RecordStore<T>,
        creds: &dyn CredentialProvider,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            SheetCommand::List { format } => {
                let handles = store.list_records(creds).await?;

                if handles.is_empty() {
                    println!("No character sheets found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&handles)?);
                    }
                    OutputFormat::Text => {
                        let label = &store.config().collection_label;
                        println!("{:<44}  NAME", "ID");
                        println!("{}", "-".repeat(80));
                        for handle in &handles {
                            println!("{:<44}  {}", handle.id, character_name(handle, label));
                        }
                        println!("\nTotal: {} sheet(s)", handles.len());
                    }
                }
                Ok(())
            }

            SheetCommand::Create { name, format } => {
                if name.trim().is_empty() {
                    return Err("Character name cannot be empty".into());
                }

                let handle = store.create_record(creds, name).await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&handle)?);
                    }
                    OutputFormat::Text => {
                        println!("Created character sheet:");
                        println!("{}", handle);
                    }
                }
                Ok(())
            }

            SheetCommand::Show { identifier, format } => {
                let handle = resolve_handle(store, creds, identifier).await?;
                let record = store.load_record(creds, &handle).await?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&record)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", handle.display_name);
                        println!("ID: {}\n", handle.id);
                        if record.is_empty() {
                            println!("(no labelled rows)");
                        } else {
                            print!("{}", format_record(&record, store.schema()));
                        }
                    }
                }
                Ok(())
            }

            SheetCommand::Set {
                identifier,
                label,
                value,
                field,
            } => {
                let handle = resolve_handle(store, creds, identifier).await?;
                let mut session = RecordSession::new(store, handle);
                session.load(creds).await?;

                let key = match field {
                    Some(key) => key.clone(),
                    None => store
                        .schema()
                        .editable_fields()
                        .first()
                        .map(|f| f.key.clone())
                        .ok_or("Layout has no editable column")?,
                };
                let entry = session
                    .current()?
                    .get(label)
                    .ok_or_else(|| FieldError::UnknownLabel(label.clone()))?;
                let previous = entry.get(&key).map(|v| v.as_str().to_string());
                let row_label = entry.label().to_string();

                session.set(label, &key, value.as_str())?;

                session.save(creds).await?;
                println!(
                    "Updated '{}' on {}: {} -> {}",
                    row_label,
                    session.handle().display_name,
                    previous.unwrap_or_default(),
                    value
                );
                Ok(())
            }

            SheetCommand::Schema { format } => {
                let schema = store.schema();
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(schema)?);
                    }
                    OutputFormat::Text => {
                        println!("Sheet: {}", schema.sheet());
                        println!("Rows: {}-{}", schema.first_row(), schema.last_row());
                        println!("Read range: {}", schema.read_range());
                        let (first, last) = schema.editable_span();
                        println!("Editable columns: {}-{}\n", first, last);

                        println!("{:<20}  {:<10}  COLUMN", "KEY", "ROLE");
                        println!("{}", "-".repeat(40));
                        for field in schema.fields() {
                            let column = field
                                .column
                                .map(|c| c.to_string())
                                .unwrap_or_else(|| "-".to_string());
                            println!("{:<20}  {:<10}  {}", field.key, field.role.to_string(), column);
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

/// Find a sheet by spreadsheet ID, full document name, or character name.
async fn resolve_handle<T: SheetsTransport>(
    store: &RecordStore<T>,
    creds: &dyn CredentialProvider,
    identifier: &str,
) -> Result<RecordHandle, Box<dyn std::error::Error>> {
    let handles = store.list_records(creds).await?;
    let label = &store.config().collection_label;

    if let Some(handle) = handles.iter().find(|h| h.id == identifier) {
        return Ok(handle.clone());
    }

    handles
        .into_iter()
        .find(|h| {
            h.display_name.eq_ignore_ascii_case(identifier)
                || character_name(h, label).eq_ignore_ascii_case(identifier)
        })
        .ok_or_else(|| format!("Character sheet not found: {}", identifier).into())
}

/// Document name without the collection prefix.
fn character_name<'a>(handle: &'a RecordHandle, label: &str) -> &'a str {
    handle
        .display_name
        .strip_prefix(label)
        .and_then(|rest| rest.strip_prefix(" - "))
        .unwrap_or(&handle.display_name)
}

/// Table of a record's rows with one column per non-label field.
fn format_record(record: &Record, schema: &ColumnSchema) -> String {
    let keys: Vec<&str> = schema
        .fields()
        .iter()
        .filter(|f| f.role != Role::Label)
        .map(|f| f.key.as_str())
        .collect();

    let mut out = format!("{:<5}  {:<24}", "ROW", "LABEL");
    for key in &keys {
        out.push_str(&format!("  {:<16}", key.to_uppercase()));
    }
    out = out.trim_end().to_string();
    out.push('\n');
    out.push_str(&"-".repeat(80));
    out.push('\n');

    for entry in record.entries() {
        let row = schema.first_row() as usize + entry.row();
        let mut line = format!("{:<5}  {:<24}", row, entry.label());
        for key in &keys {
            let value = entry.get(key).map(|v| v.as_str()).unwrap_or("");
            line.push_str(&format!("  {:<16}", value));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use charsheet_core::{
        decode, Credential, MemoryTransport, RemoteFile, StoreConfig,
    };

    fn schema() -> ColumnSchema {
        ColumnSchema::builder("Sheet1")
            .rows(2, 50)
            .label("stat", "A")
            .editable("value", "B")
            .formula("total", "C")
            .build()
            .unwrap()
    }

    fn store() -> RecordStore<MemoryTransport> {
        let transport = MemoryTransport::new()
            .with_file(RemoteFile::spreadsheet(
                "abc123",
                "Witcher Character Sheet - Geralt",
            ))
            .with_file(RemoteFile::spreadsheet(
                "def456",
                "Witcher Character Sheet - Yennefer",
            ));
        RecordStore::new(transport, schema(), StoreConfig::default())
    }

    #[tokio::test]
    async fn test_resolve_by_id_and_name() {
        let store = store();
        let creds = Credential::new("tok");

        let by_id = resolve_handle(&store, &creds, "def456").await.unwrap();
        assert_eq!(by_id.id, "def456");

        let by_name = resolve_handle(&store, &creds, "geralt").await.unwrap();
        assert_eq!(by_name.id, "abc123");

        let by_full_name = resolve_handle(&store, &creds, "Witcher Character Sheet - Yennefer")
            .await
            .unwrap();
        assert_eq!(by_full_name.id, "def456");

        let missing = resolve_handle(&store, &creds, "Ciri").await.unwrap_err();
        assert_eq!(missing.to_string(), "Character sheet not found: Ciri");
    }

    #[test]
    fn test_character_name() {
        let handle = RecordHandle::new("1", "Witcher Character Sheet - Ciri");
        assert_eq!(character_name(&handle, "Witcher Character Sheet"), "Ciri");

        let other = RecordHandle::new("2", "Ciri's notes");
        assert_eq!(character_name(&other, "Witcher Character Sheet"), "Ciri's notes");
    }

    #[test]
    fn test_format_record() {
        let grid = vec![
            vec!["Name".to_string(), "Geralt".to_string(), "=A2".to_string()],
            vec![],
            vec!["Level".to_string(), "5".to_string()],
        ];
        let record = decode(&grid, &schema());
        let text = format_record(&record, &schema());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ROW"));
        assert!(lines[0].contains("VALUE"));
        assert!(lines[0].ends_with("TOTAL"));
        assert!(lines[2].starts_with("2 "));
        assert!(lines[2].contains("Geralt"));
        assert!(lines[2].ends_with("=A2"));
        assert!(lines[3].starts_with("4 "));
        assert!(lines[3].ends_with("5"));
    }
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use table_search_core::{
    fetch_remote_csv, index_name_for_file, load_csv_table, sanitize_index_name, DocumentStore,
    ElasticStore, QueryOptions, ScrollOptions, Table,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "table-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Elasticsearch base URL
    #[arg(long, env = "ES_HOST", default_value = "http://localhost:9200")]
    es_url: String,

    /// Basic-auth username
    #[arg(long, env = "ES_USER")]
    es_user: Option<String>,

    /// Basic-auth password
    #[arg(long, env = "ES_PASS", hide_env_values = true)]
    es_pass: Option<String>,

    /// Edit-distance tolerance applied to every fuzzy clause.
    #[arg(long, default_value = "2")]
    fuzziness: u32,

    /// Documents fetched per scroll page during full reads.
    #[arg(long, default_value = "1000")]
    scroll_page_size: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize a CSV file and bulk-index it. One ingest-and-exit run.
    Ingest {
        /// Path to the CSV file.
        file: PathBuf,

        /// Target index name; defaults to the sanitized file stem.
        #[arg(long)]
        index: Option<String>,

        /// Download the file from this URL first when it is missing locally.
        #[arg(long)]
        fetch_url: Option<String>,
    },
    /// List every index in the backend.
    Indices,
    /// List the mapped fields of one index.
    Fields {
        index: String,
    },
    /// Read the full contents of an index (paginated scan) and print it.
    Dump {
        index: String,
    },
    /// Fuzzy search. A document matches when ANY filter or term matches.
    Search {
        index: String,

        /// Field-scoped filter as field=term; repeatable.
        #[arg(long = "filter", value_parser = parse_key_val)]
        filters: Vec<(String, String)>,

        /// Free term matched against all fields; repeatable.
        #[arg(long = "term")]
        terms: Vec<String>,

        /// Restrict free terms to these fields; defaults to every mapped field.
        #[arg(long = "field")]
        fields: Vec<String>,
    },
}

/// Parse a `field=term` pair for `--filter` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid FIELD=TERM: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %chrono::Utc::now().to_rfc3339(),
        "table-search boot"
    );

    let mut store = ElasticStore::new(&cli.es_url)?
        .with_query_options(QueryOptions {
            fuzziness: cli.fuzziness,
        })
        .with_scroll_options(ScrollOptions {
            page_size: cli.scroll_page_size,
            ..ScrollOptions::default()
        });
    if let (Some(user), Some(pass)) = (&cli.es_user, &cli.es_pass) {
        store = store.with_credentials(user, pass);
    }

    match cli.command {
        Command::Ingest {
            file,
            index,
            fetch_url,
        } => {
            if let Some(url) = fetch_url {
                if !file.exists() {
                    info!(path = %file.display(), "local file missing, fetching remote copy");
                    fetch_remote_csv(&url, &file).await?;
                }
            }

            let table = load_csv_table(&file)?;
            let index = match index {
                Some(name) => sanitize_index_name(&name),
                None => index_name_for_file(&file)?,
            };

            info!(index = %index, rows = table.len(), "ingesting table");
            let report = store.bulk_load(&index, &table).await?;

            if report.is_partial() {
                warn!(failed = report.failed_count, "backend rejected some documents");
                for reason in &report.failed_reasons {
                    warn!(%reason, "bulk item failure");
                }
            }

            println!(
                "{} document(s) indexed into {} at {} ({} failed)",
                report.success_count,
                report.index,
                report.completed_at.to_rfc3339(),
                report.failed_count
            );
        }
        Command::Indices => {
            let indices = store.list_indices().await;
            if indices.is_empty() {
                println!("no indices yet");
            }
            for name in indices {
                println!("{name}");
            }
        }
        Command::Fields { index } => {
            let fields = store.list_fields(&index).await;
            if fields.is_empty() {
                println!("no mapped fields (does the index exist?)");
            }
            for field in fields {
                println!("{field}");
            }
        }
        Command::Dump { index } => {
            let table = store.read_all(&index).await?;
            print_table(&table);
            println!("{} row(s)", table.len());
        }
        Command::Search {
            index,
            filters,
            terms,
            fields,
        } => {
            let table = if !filters.is_empty() {
                store.search_per_field(&index, &filters).await?
            } else if !terms.is_empty() {
                let fields = if fields.is_empty() {
                    store.list_fields(&index).await
                } else {
                    fields
                };
                if fields.is_empty() {
                    anyhow::bail!("index '{}' has no mapped fields to search", index);
                }
                store.search_any_field(&index, &fields, &terms).await?
            } else {
                anyhow::bail!("provide at least one --filter field=term or --term");
            };

            print_table(&table);
            println!("{} row(s)", table.len());
        }
    }

    Ok(())
}

/// Render a table with columns padded to their widest cell.
fn print_table(table: &Table) {
    if table.columns.is_empty() {
        return;
    }

    let widths: Vec<usize> = table
        .columns
        .iter()
        .map(|column| {
            table
                .rows
                .iter()
                .filter_map(|row| row.get(column))
                .map(String::len)
                .chain(std::iter::once(column.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(column, &width)| format!("{column:width$}"))
        .collect();
    println!("{}", header.join("  "));
    println!("{}", "-".repeat(header.join("  ").len()));

    for row in &table.rows {
        let line: Vec<String> = table
            .columns
            .iter()
            .zip(&widths)
            .map(|(column, &width)| {
                let value = row.get(column).map(String::as_str).unwrap_or("");
                format!("{value:width$}")
            })
            .collect();
        println!("{}", line.join("  "));
    }
}

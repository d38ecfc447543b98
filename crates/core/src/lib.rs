pub mod error;
pub mod ingest;
pub mod models;
pub mod naming;
pub mod normalize;
pub mod session;
pub mod stores;
pub mod tabular;
pub mod traits;

pub use error::{IngestError, SearchError};
pub use ingest::{fetch_remote_csv, index_name_for_file, load_csv_table};
pub use models::{LoadReport, QueryOptions, Row, ScrollOptions, Table};
pub use naming::sanitize_index_name;
pub use normalize::{normalize, MISSING_SENTINELS, NUMERIC_FILL, TEXT_FILL};
pub use session::{IndexRefresh, SearchSession};
pub use stores::ElasticStore;
pub use tabular::read_csv_table;
pub use traits::DocumentStore;

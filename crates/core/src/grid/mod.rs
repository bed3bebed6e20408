//! Grid data model: labeled dataset, schema, coordinate axes and tabular records

pub mod coords;
pub mod dataset;
pub mod record;
pub mod schema;
pub mod synthetic;

// Re-export main types
pub use coords::{embed_rows, Axis, CoordinateMatch};
pub use dataset::{Field, FieldMeta, GridDataset};
pub use record::FeatureRecord;
pub use schema::{harmonize, StageSchema, Variable};

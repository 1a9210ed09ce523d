mod report;
pub use report::{node_path, records, report};

pub mod algorithms;
pub mod pipeline;

pub use algorithms::cluster::Cluster;
pub use algorithms::kmeans::{ClusterEngine, ClusterRun};
pub use pipeline::evaluation::{compare, Evaluation};
pub use pipeline::imputer::{FillStats, Imputer};
pub use pipeline::{impute, ImputeReport, Pipeline};

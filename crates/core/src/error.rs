use thiserror::Error;

#[derive(Error, Debug)]
pub enum CfmvError {
    #[error("Format error: {0}")]
    Format(String),

    #[error("Parse error at record {row}, feature {column}: {value:?} is not a valid {expected}")]
    Parse {
        row: usize,
        column: usize,
        value: String,
        expected: &'static str,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Undefined imputation: every member of cluster {cluster} is missing feature {feature}")]
    UndefinedImputation { cluster: usize, feature: usize },
}

pub type Result<T> = std::result::Result<T, CfmvError>;

use thiserror::Error;

pub type CrnResult<T> = Result<T, CrnError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrnError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },
}

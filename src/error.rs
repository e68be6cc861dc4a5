use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelatedEventsError {
    #[error("event project id '{project_id}' is not a numeric project id")]
    InvalidProjectId { project_id: String },
}

/// Reasons a result row cannot be shown as a related event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("row has no id")]
    MissingId,
}

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("Search parameter '{name}' is not supported for resource type '{resource_type}'")]
    SearchParameterNotSupported {
        resource_type: String,
        name: String,
    },

    #[error("Resource type '{0}' is not supported")]
    ResourceNotSupported(String),

    #[error("Invalid search operation: {0}")]
    InvalidSearchOperation(String),

    #[error("Invalid value for search parameter '{parameter}': {message}")]
    InvalidSearchValue { parameter: String, message: String },
}

impl SearchError {
    pub fn parameter_not_supported(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::SearchParameterNotSupported {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidSearchOperation(message.into())
    }

    /// True for the two kinds that mean "this resource/parameter combination
    /// does not exist" rather than "the request is malformed".
    pub fn is_not_supported(&self) -> bool {
        matches!(
            self,
            Self::SearchParameterNotSupported { .. } | Self::ResourceNotSupported(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;

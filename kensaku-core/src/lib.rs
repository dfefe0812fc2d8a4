pub mod error;
pub mod operation_outcome;
pub mod resource_type;
pub mod search_param;
pub mod search_param_registry;

pub use error::{Result, SearchError};
pub use operation_outcome::{IssueSeverity, IssueType, OperationOutcome, OperationOutcomeIssue};
pub use resource_type::{is_resource_type, RESOURCE_TYPES};
pub use search_param::{
    SearchComparator, SearchModifier, SearchParamType, SearchParameterComponent,
    SearchParameterInfo,
};
pub use search_param_registry::{SearchParamRegistry, SearchParameterDefinitionManager};

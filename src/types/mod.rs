pub mod endpoint;
pub mod error;
pub mod operation;
pub mod utils;

pub use endpoint::{EndpointData, Parameter, ProjectContext, ResponseSpec};
pub use error::{
    ApiDocError, ErrorCategory, ErrorClassifier, ErrorCode, ErrorStatus, OperationError,
    ProviderError, Result,
};
pub use operation::*;
pub use utils::{
    generate_result_id, json_bool, json_f64, json_string, json_string_array, truncate_chars,
};

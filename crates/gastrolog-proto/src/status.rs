//! Maps the error taxonomy of design §7 onto `tonic::Status` codes.

use gastrolog_repr::FrontendError;
use tonic::{Code, Status};

impl From<FrontendError> for Status {
    fn from(err: FrontendError) -> Status {
        let code = match &err {
            FrontendError::InvalidArgument(_) => Code::InvalidArgument,
            FrontendError::NotFound(_) => Code::NotFound,
            FrontendError::AlreadyExists(_) => Code::AlreadyExists,
            FrontendError::FailedPrecondition(_) => Code::FailedPrecondition,
            FrontendError::Unauthenticated => Code::Unauthenticated,
            FrontendError::PermissionDenied(_) => Code::PermissionDenied,
            FrontendError::ResourceExhausted(_) => Code::ResourceExhausted,
            FrontendError::Canceled => Code::Cancelled,
            FrontendError::Unavailable(_) => Code::Unavailable,
            FrontendError::Internal(_) => Code::Internal,
        };
        Status::new(code, err.to_string())
    }
}

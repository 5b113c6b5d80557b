#[cfg(feature = "docs")]
use utoipa::ToResponse;

#[allow(dead_code)]
#[cfg_attr(feature = "docs", derive(ToResponse))]
#[cfg_attr(feature = "docs", response(description = "Bad Request"))]
pub struct BadRequestResponse;

#[allow(dead_code)]
#[cfg_attr(feature = "docs", derive(ToResponse))]
#[cfg_attr(feature = "docs", response(description = "Not Found"))]
pub struct NotFoundResponse;

#[allow(dead_code)]
#[cfg_attr(feature = "docs", derive(ToResponse))]
#[cfg_attr(feature = "docs", response(
    description = "Insufficient credits, with suggested shorter durations the balance can still afford"
))]
pub struct InsufficientCreditsResponse;

#[allow(dead_code)]
#[cfg_attr(feature = "docs", derive(ToResponse))]
#[cfg_attr(feature = "docs", response(description = "Conflict"))]
pub struct ConflictResponse;

#[allow(dead_code)]
#[cfg_attr(feature = "docs", derive(ToResponse))]
#[cfg_attr(feature = "docs", response(description = "Validation Error"))]
pub struct ValidationErrorResponse;

#[allow(dead_code)]
#[cfg_attr(feature = "docs", derive(ToResponse))]
#[cfg_attr(feature = "docs", response(description = "Internal Server Error"))]
pub struct InternalServerErrorResponse;

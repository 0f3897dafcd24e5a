use serde_json::Value;

use crate::error::ValidationError;
use crate::models::{
    AggregateResult, BatchError, Conflict, ConflictType, RequestDescriptor, SubResponse,
};

/// Reduce batch sub-responses into published/conflicts/skipped/errors.
///
/// `responses[i]` must answer `requests[i]`; unequal lengths are rejected
/// before anything is classified.
pub fn aggregate(
    responses: Vec<SubResponse>,
    requests: Vec<RequestDescriptor>,
) -> Result<AggregateResult, ValidationError> {
    if responses.len() != requests.len() {
        return Err(ValidationError::LengthMismatch {
            responses: responses.len(),
            requests: requests.len(),
        });
    }

    let mut results = AggregateResult::default();

    for (response, request) in responses.into_iter().zip(requests) {
        match response.status {
            200..=399 => results.published.push(response.body),
            404 => results.skipped.push(response.body),
            412 => {
                let remote = response
                    .body
                    .get("details")
                    .and_then(|details| details.get("existing"))
                    .cloned()
                    .unwrap_or(Value::Null);
                results.conflicts.push(Conflict {
                    conflict_type: ConflictType::Outgoing,
                    local: request.body.unwrap_or(Value::Null),
                    remote,
                });
            }
            _ => results.errors.push(BatchError {
                path: response.path,
                sent: request,
                error: response.body,
            }),
        }
    }

    tracing::debug!(
        published = results.published.len(),
        conflicts = results.conflicts.len(),
        skipped = results.skipped.len(),
        errors = results.errors.len(),
        "Aggregated batch responses"
    );

    Ok(results)
}

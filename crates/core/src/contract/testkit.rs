//! Contract checks shared by backend test suites.
//!
//! A backend that reports [`Availability::Ready`](crate::backend::Availability)
//! must preserve payloads, hand out fresh owned copies from ranges and keep
//! its references balanced. `verify_backend` exercises those rules through the
//! public wrappers and reports every deviation it finds.

use crate::backend::MarkerBackend;
use crate::error::MarkerError;
use crate::marker::{TextMarker, TextMarkerRange};
use crate::record::TextMarkerRecord;

/// Endpoint of a range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    End,
}

/// Result of a contract check.
#[derive(Clone, Debug, PartialEq)]
pub enum ContractIssue {
    NotReady {
        reason: String,
    },
    PrimitiveFailed {
        operation: &'static str,
        error: MarkerError,
    },
    RoundTripMismatch {
        expected: TextMarkerRecord,
        actual: TextMarkerRecord,
    },
    EndpointMismatch {
        endpoint: Endpoint,
        expected: TextMarkerRecord,
        actual: TextMarkerRecord,
    },
    EndpointNotEqual {
        endpoint: Endpoint,
    },
    IndistinctTypeIds,
    ReferenceImbalance {
        before: usize,
        after: usize,
    },
}

/// Checks `backend` against the marker contract using `samples` as payloads.
/// Samples are paired up as consecutive range endpoints.
pub fn verify_backend(
    backend: &'static dyn MarkerBackend,
    samples: &[TextMarkerRecord],
) -> Vec<ContractIssue> {
    let mut issues = Vec::new();

    let availability = backend.availability();
    if !availability.is_ready() {
        issues.push(ContractIssue::NotReady {
            reason: availability.reason().unwrap_or_default().to_owned(),
        });
        return issues;
    }

    let before = backend.live_references();
    check_type_ids(backend, &mut issues);
    for record in samples {
        check_round_trip(backend, record, &mut issues);
    }
    for pair in samples.chunks(2) {
        let (start, end) = match pair {
            [start, end] => (start, end),
            [single] => (single, single),
            _ => continue,
        };
        check_range(backend, start, end, &mut issues);
    }

    if let (Some(before), Some(after)) = (before, backend.live_references())
        && before != after
    {
        issues.push(ContractIssue::ReferenceImbalance { before, after });
    }

    issues
}

/// Like [`verify_backend`] but fails with the list of issues.
pub fn require_backend(
    backend: &'static dyn MarkerBackend,
    samples: &[TextMarkerRecord],
) -> Result<(), Vec<ContractIssue>> {
    let issues = verify_backend(backend, samples);
    if issues.is_empty() { Ok(()) } else { Err(issues) }
}

fn check_type_ids(backend: &'static dyn MarkerBackend, issues: &mut Vec<ContractIssue>) {
    match (backend.marker_type_id(), backend.range_type_id()) {
        (Ok(marker), Ok(range)) if marker == range => issues.push(ContractIssue::IndistinctTypeIds),
        (Ok(_), Ok(_)) => {}
        (Err(error), _) => {
            issues.push(ContractIssue::PrimitiveFailed { operation: "marker_type_id", error });
        }
        (_, Err(error)) => {
            issues.push(ContractIssue::PrimitiveFailed { operation: "range_type_id", error });
        }
    }
}

fn check_round_trip(
    backend: &'static dyn MarkerBackend,
    record: &TextMarkerRecord,
    issues: &mut Vec<ContractIssue>,
) {
    let marker = match TextMarker::new(backend, record) {
        Ok(marker) => marker,
        Err(error) => {
            issues.push(ContractIssue::PrimitiveFailed { operation: "create_marker", error });
            return;
        }
    };
    let first = match marker.record() {
        Ok(first) => first,
        Err(error) => {
            issues.push(ContractIssue::PrimitiveFailed { operation: "marker_bytes", error });
            return;
        }
    };
    if first != *record {
        issues.push(ContractIssue::RoundTripMismatch { expected: *record, actual: first });
        return;
    }

    // Re-encode what was read and read it again.
    let again = TextMarker::new(backend, &first).and_then(|marker| marker.record());
    match again {
        Ok(second) if second != first => {
            issues.push(ContractIssue::RoundTripMismatch { expected: first, actual: second });
        }
        Ok(_) => {}
        Err(error) => issues.push(ContractIssue::PrimitiveFailed { operation: "reencode", error }),
    }
}

fn check_range(
    backend: &'static dyn MarkerBackend,
    start: &TextMarkerRecord,
    end: &TextMarkerRecord,
    issues: &mut Vec<ContractIssue>,
) {
    let markers = TextMarker::new(backend, start)
        .and_then(|a| TextMarker::new(backend, end).map(|b| (a, b)));
    let (a, b) = match markers {
        Ok(markers) => markers,
        Err(error) => {
            issues.push(ContractIssue::PrimitiveFailed { operation: "create_marker", error });
            return;
        }
    };
    let range = match TextMarkerRange::new(&a, &b) {
        Ok(range) => range,
        Err(error) => {
            issues.push(ContractIssue::PrimitiveFailed { operation: "create_range", error });
            return;
        }
    };

    for (endpoint, original, expected) in [(Endpoint::Start, &a, start), (Endpoint::End, &b, end)] {
        let copied = match endpoint {
            Endpoint::Start => range.start(),
            Endpoint::End => range.end(),
        };
        let copied = match copied {
            Ok(copied) => copied,
            Err(error) => {
                let operation = match endpoint {
                    Endpoint::Start => "copy_range_start",
                    Endpoint::End => "copy_range_end",
                };
                issues.push(ContractIssue::PrimitiveFailed { operation, error });
                continue;
            }
        };
        if copied != *original {
            issues.push(ContractIssue::EndpointNotEqual { endpoint });
        }
        match copied.record() {
            Ok(actual) if actual != *expected => issues.push(ContractIssue::EndpointMismatch {
                endpoint,
                expected: *expected,
                actual,
            }),
            Ok(_) => {}
            Err(error) => {
                issues.push(ContractIssue::PrimitiveFailed { operation: "marker_bytes", error });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::UNAVAILABLE_BACKEND;
    use crate::record::{AxId, NodeHandle};
    use rstest::rstest;

    #[rstest]
    fn unavailable_backend_is_reported_not_ready() {
        let samples = [TextMarkerRecord::new(AxId(1), NodeHandle(1), 0)];
        let issues = verify_backend(&UNAVAILABLE_BACKEND, &samples);
        assert_eq!(issues.len(), 1);
        assert!(matches!(issues[0], ContractIssue::NotReady { .. }), "{issues:?}");
        assert!(require_backend(&UNAVAILABLE_BACKEND, &samples).is_err());
    }
}

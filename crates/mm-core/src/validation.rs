use crate::error::ValidationError;
use crate::types::{BoundingBox, DetectRequest, NewDetection, SpotId};

/// Checks the fields the gateway requires before anything reaches the store.
///
/// Only presence and shape are checked. Geometry and confidence range are
/// stored as sent.
pub fn validate_detect_request(request: DetectRequest) -> Result<NewDetection, ValidationError> {
    let bbox = match request.bbox {
        None => return Err(ValidationError::MissingField { field: "bbox" }),
        Some(values) if values.is_empty() => {
            return Err(ValidationError::MissingField { field: "bbox" });
        }
        Some(values) => <[f64; 4]>::try_from(values.as_slice()).map_err(|_| {
            ValidationError::InvalidField {
                field: "bbox",
                message: format!("expected 4 coordinates, got {}", values.len()),
            }
        })?,
    };
    let Some(spot_id) = request.spot_id else {
        return Err(ValidationError::MissingField { field: "spot_id" });
    };

    Ok(NewDetection {
        spot_id: SpotId::new(spot_id.to_string()),
        bbox: BoundingBox::from(bbox),
        confidence: request.confidence.unwrap_or(0.0),
        class_name: request.class_name.unwrap_or_default(),
        plate: request.plate,
        sent_at: request.sent_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpotIdInput;

    fn request() -> DetectRequest {
        DetectRequest {
            spot_id: Some(SpotIdInput::from("V1")),
            bbox: Some(vec![10.0, 20.0, 110.0, 220.0]),
            ..DetectRequest::default()
        }
    }

    #[test]
    fn optional_fields_default() {
        let detection = validate_detect_request(request()).unwrap();
        assert_eq!(detection.spot_id.as_str(), "V1");
        assert_eq!(detection.bbox, BoundingBox::new(10.0, 20.0, 110.0, 220.0));
        assert_eq!(detection.confidence, 0.0);
        assert_eq!(detection.class_name, "");
        assert_eq!(detection.plate, None);
        assert_eq!(detection.sent_at, None);
    }

    #[test]
    fn missing_bbox_is_rejected() {
        let err = validate_detect_request(DetectRequest {
            bbox: None,
            ..request()
        })
        .unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { field: "bbox" }));

        let err = validate_detect_request(DetectRequest {
            bbox: Some(Vec::new()),
            ..request()
        })
        .unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { field: "bbox" }));
    }

    #[test]
    fn short_bbox_is_rejected() {
        let err = validate_detect_request(DetectRequest {
            bbox: Some(vec![1.0, 2.0, 3.0]),
            ..request()
        })
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "bbox", .. }));
    }

    #[test]
    fn missing_spot_is_rejected() {
        let err = validate_detect_request(DetectRequest {
            spot_id: None,
            ..request()
        })
        .unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { field: "spot_id" }));
    }

    #[test]
    fn empty_spot_becomes_unknown() {
        let detection = validate_detect_request(DetectRequest {
            spot_id: Some(SpotIdInput::from("")),
            ..request()
        })
        .unwrap();
        assert!(detection.spot_id.is_unknown());
    }

    #[test]
    fn numeric_spot_is_stored_as_text() {
        let detection = validate_detect_request(DetectRequest {
            spot_id: Some(SpotIdInput::Integer(1)),
            ..request()
        })
        .unwrap();
        assert_eq!(detection.spot_id.as_str(), "1");
    }

    #[test]
    fn inverted_geometry_is_kept() {
        let detection = validate_detect_request(DetectRequest {
            bbox: Some(vec![300.0, 300.0, 10.0, 10.0]),
            confidence: Some(7.5),
            ..request()
        })
        .unwrap();
        assert_eq!(detection.bbox.xmin, 300.0);
        assert_eq!(detection.confidence, 7.5);
    }
}

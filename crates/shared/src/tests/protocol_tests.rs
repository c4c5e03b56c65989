use super::*;

#[test]
fn missing_results_key_is_rejected() {
    let err = serde_json::from_str::<UploadResponse>(r#"{"images_processed": 2}"#)
        .expect_err("results is required");
    assert!(err.to_string().contains("results"), "unexpected error: {err}");
}

#[test]
fn null_results_read_as_empty() {
    let parsed: UploadResponse =
        serde_json::from_str(r#"{"images_processed": 0, "results": null}"#).expect("parse");
    assert!(parsed.results.is_empty());
    assert_eq!(parsed.processed_count(), 0);
}

#[test]
fn processed_count_falls_back_to_result_len() {
    let parsed: UploadResponse = serde_json::from_str(
        r#"{"results": [{"filename": "a.png", "status": "error", "error": "bad"}]}"#,
    )
    .expect("parse");
    assert_eq!(parsed.processed_count(), 1);
}

#[test]
fn success_payload_maps_to_success_variant() {
    let payload: ImageResultPayload = serde_json::from_str(
        r#"{"filename":"cat.png","status":"success","mean_activation":0.5,
            "max_activation":3.25,"shape":[1,2048,7,7],"feature_visualization":"iVBORw0KGgo="}"#,
    )
    .expect("parse");

    match ImageResult::from(payload) {
        ImageResult::Success {
            filename,
            stats,
            shape,
            feature_visualization,
        } => {
            assert_eq!(filename, "cat.png");
            assert_eq!(stats, ActivationStats { mean: 0.5, max: 3.25 });
            assert_eq!(shape, Some(vec![1, 2048, 7, 7]));
            assert_eq!(feature_visualization.as_deref(), Some("iVBORw0KGgo="));
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[test]
fn unknown_status_is_not_success() {
    let payload: ImageResultPayload =
        serde_json::from_str(r#"{"filename":"x.jpg","status":"skipped"}"#).expect("parse");
    assert_eq!(payload.status, ResultStatus::Unknown);
    assert_eq!(
        ImageResult::from(payload),
        ImageResult::Error {
            filename: "x.jpg".to_string(),
            message: None,
        }
    );
}

#[test]
fn success_without_stats_becomes_error_entry() {
    let payload: ImageResultPayload =
        serde_json::from_str(r#"{"filename":"x.jpg","status":"success","max_activation":1.0}"#)
            .expect("parse");
    let result = ImageResult::from(payload);
    assert!(!result.is_success());
    assert_eq!(
        result,
        ImageResult::Error {
            filename: "x.jpg".to_string(),
            message: Some("malformed success result: missing mean_activation".to_string()),
        }
    );
}

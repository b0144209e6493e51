use api::{DetectionEvent, EyeRegion, FaceDetection};

fn payload_with_one_face() -> String {
    let pixels: Vec<u8> = vec![1, 2, 3, 4];
    serde_json::json!({
        "faces": [{
            "firstEye": { "x": 101.5, "y": 88.0 },
            "secondEye": { "x": 163.25, "y": 90.5 },
            "firstEyeData": { "width": 1, "height": 1, "pixels": pixels },
            "secondEyeData": { "width": 1, "height": 1, "pixels": pixels },
        }]
    })
    .to_string()
}

#[test]
fn test_parse_detector_payload() {
    let event: DetectionEvent =
        serde_json::from_str(&payload_with_one_face()).expect("valid detector payload");

    assert_eq!(event.faces.len(), 1);
    let face = &event.faces[0];
    assert_eq!(face.first_eye.unwrap().x, 101.5);
    assert_eq!(face.second_eye.unwrap().y, 90.5);

    let eyes = event.usable_eyes().expect("one face, both eyes");
    assert_eq!(eyes.first.width, 1);
    assert_eq!(eyes.first.pixels, vec![1, 2, 3, 4]);
}

#[test]
fn test_null_eye_is_not_usable() {
    let raw = serde_json::json!({
        "faces": [{
            "firstEye": null,
            "secondEye": { "x": 10.0, "y": 10.0 },
            "firstEyeData": null,
            "secondEyeData": { "width": 1, "height": 1, "pixels": [0, 0, 0, 0] },
        }]
    })
    .to_string();

    let event: DetectionEvent = serde_json::from_str(&raw).expect("valid payload");
    assert!(event.usable_eyes().is_none());
}

#[test]
fn test_missing_buffer_is_not_usable() {
    // Anchors present but a pixel buffer missing: the frame is unusable even
    // though the detector claims to have seen both eyes.
    let raw = serde_json::json!({
        "faces": [{
            "firstEye": { "x": 1.0, "y": 1.0 },
            "secondEye": { "x": 2.0, "y": 2.0 },
            "firstEyeData": { "width": 1, "height": 1, "pixels": [0, 0, 0, 0] },
            "secondEyeData": null,
        }]
    })
    .to_string();

    let event: DetectionEvent = serde_json::from_str(&raw).expect("valid payload");
    assert!(event.usable_eyes().is_none());
}

#[test]
fn test_zero_and_multi_face_events_are_not_usable() {
    let empty: DetectionEvent = serde_json::from_str(r#"{"faces":[]}"#).expect("valid payload");
    assert!(empty.usable_eyes().is_none());

    let two_faces = DetectionEvent {
        faces: vec![FaceDetection::default(), FaceDetection::default()],
    };
    assert!(two_faces.usable_eyes().is_none());
}

#[test]
fn test_event_round_trips_through_json() {
    let original: DetectionEvent =
        serde_json::from_str(&payload_with_one_face()).expect("valid payload");
    let encoded = serde_json::to_string(&original).expect("serialize");
    let decoded: DetectionEvent = serde_json::from_str(&encoded).expect("deserialize");
    assert_eq!(original, decoded);

    // Field names stay camelCase on the wire.
    assert!(encoded.contains("firstEyeData"));
    assert!(encoded.contains("secondEye"));
}

#[test]
fn test_expected_len_matches_rgba_layout() {
    let region = EyeRegion {
        width: 95,
        height: 95,
        pixels: vec![0; 95 * 95 * 4],
    };
    assert_eq!(region.expected_len(), region.pixels.len());
}

use base64::Engine;
use loqa_recorder::audio::AudioArtifact;
use loqa_recorder::nats::messages::{RecordingUploadMessage, STATUS_IN_PROGRESS, STATUS_SUCCESS};
use loqa_recorder::session::Channel;
use loqa_recorder::upload::{FinishedRecording, ImportedAudio};

const TIMESTAMP: &str = "2025-10-27T14-30-00-123Z";

#[test]
fn test_recording_message_serialization() {
    let recording = FinishedRecording::new(
        Channel::Achievement,
        AudioArtifact::new(vec![7u8; 100], "audio/webm;codecs=opus"),
        42,
    );

    let msg = RecordingUploadMessage::for_recording("user-1", &recording, TIMESTAMP);
    assert_eq!(msg.file_name, "user-1-achievement-2025-10-27T14-30-00-123Z.webm");
    assert_eq!(msg.file_path, "user-1/user-1-achievement-2025-10-27T14-30-00-123Z.webm");
    assert_eq!(msg.subject("recordings"), "recordings.user-1.achievement");

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"duration\":42"));
    assert!(json.contains("\"status\":\"success\""));
    assert!(json.contains("audio/webm;codecs=opus"));

    let deserialized: RecordingUploadMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, msg);
    assert_eq!(deserialized.extension, "webm");
    assert_eq!(deserialized.status, STATUS_SUCCESS);

    let payload = base64::engine::general_purpose::STANDARD
        .decode(&deserialized.payload)
        .unwrap();
    assert_eq!(payload, vec![7u8; 100]);
}

#[test]
fn test_excuse_message_subject() {
    let recording = FinishedRecording::new(Channel::Excuse, AudioArtifact::new(vec![1], "audio/mp3"), 3);

    let msg = RecordingUploadMessage::for_recording("u", &recording, TIMESTAMP);
    assert_eq!(msg.subject("team.audio"), "team.audio.u.excuse");
    assert_eq!(msg.file_name, "u-excuse-2025-10-27T14-30-00-123Z.mp3");
}

#[test]
fn test_import_message_has_no_duration() {
    let import = ImportedAudio::new("weekly.m4a", "audio/mp4", vec![0u8; 16]).unwrap();

    let msg = RecordingUploadMessage::for_import("user-1", &import, TIMESTAMP);
    assert_eq!(msg.label, "x");
    assert_eq!(msg.file_name, "user-1-x-2025-10-27T14-30-00-123Z.audio");
    assert_eq!(msg.file_type, "audio/mp4");
    assert_eq!(msg.duration, None);
    assert_eq!(msg.status, STATUS_IN_PROGRESS);

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"duration\":null"));
}

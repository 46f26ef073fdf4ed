use super::UploadEvent;
use crate::upload::{FileState, UploadStatus};
use serde::{Deserialize, Serialize};

/// Tagged event the native uploader emits on its single `upload-event` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NativeUploadEvent {
    CameraFound {
        device_id: String,
    },
    FilePending {
        filename: String,
        total_bytes: u64,
    },
    FileStarted {
        filename: String,
        total_bytes: u64,
    },
    FileProgress {
        filename: String,
        bytes_uploaded: u64,
        total_bytes: u64,
    },
    FileSkipped {
        filename: String,
    },
    FileCompleted {
        filename: String,
    },
    FileFailed {
        filename: String,
        error: String,
    },
}

impl NativeUploadEvent {
    pub const CHANNEL: &'static str = "upload-event";

    /// Channel event carried by this native event; `CameraFound` has none.
    pub fn into_upload_event(self) -> Option<UploadEvent> {
        let event = match self {
            Self::CameraFound { .. } => return None,
            Self::FilePending {
                filename,
                total_bytes,
            } => UploadEvent::Progress(UploadStatus {
                total_bytes,
                status: FileState::Pending,
                ..UploadStatus::new(filename)
            }),
            Self::FileStarted {
                filename,
                total_bytes,
            } => UploadEvent::Progress(UploadStatus::uploading(filename, 0, total_bytes)),
            Self::FileProgress {
                filename,
                bytes_uploaded,
                total_bytes,
            } => UploadEvent::Progress(UploadStatus::uploading(
                filename,
                bytes_uploaded,
                total_bytes,
            )),
            // The channel contract drops the skipped file's name.
            Self::FileSkipped { .. } => UploadEvent::Skipped,
            Self::FileCompleted { filename } => UploadEvent::Complete { filename },
            Self::FileFailed { filename, error } => UploadEvent::Error { filename, error },
        };
        Some(event)
    }

    pub fn device_id(&self) -> Option<&str> {
        match self {
            Self::CameraFound { device_id } => Some(device_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_tagged_payload() {
        let event: NativeUploadEvent = serde_json::from_value(json!({
            "type": "FileProgress",
            "filename": "DSC_0042.NEF",
            "bytes_uploaded": 4096,
            "total_bytes": 16384
        }))
        .unwrap();

        match event.into_upload_event() {
            Some(UploadEvent::Progress(status)) => {
                assert_eq!(status.filename, "DSC_0042.NEF");
                assert_eq!(status.status, FileState::Uploading);
                assert_eq!(status.percentage, 25.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn pending_keeps_total_and_zero_progress() {
        let event = NativeUploadEvent::FilePending {
            filename: "a.jpg".to_string(),
            total_bytes: 99,
        };
        let Some(UploadEvent::Progress(status)) = event.into_upload_event() else {
            panic!("expected progress");
        };
        assert_eq!(status.status, FileState::Pending);
        assert_eq!(status.total_bytes, 99);
        assert_eq!(status.bytes_uploaded, 0);
    }

    #[test]
    fn skipped_and_camera_found() {
        let skipped = NativeUploadEvent::FileSkipped {
            filename: "dup.jpg".to_string(),
        };
        assert_eq!(skipped.into_upload_event(), Some(UploadEvent::Skipped));

        let found = NativeUploadEvent::CameraFound {
            device_id: "usb:001,004".to_string(),
        };
        assert_eq!(found.device_id(), Some("usb:001,004"));
        assert_eq!(found.into_upload_event(), None);
    }

    #[test]
    fn failures_map_to_error_channel() {
        let failed = NativeUploadEvent::FileFailed {
            filename: "b.jpg".to_string(),
            error: "timeout".to_string(),
        };
        assert_eq!(
            failed.into_upload_event().map(|e| e.channel()),
            Some(crate::events::EventChannel::UploadError)
        );
    }
}

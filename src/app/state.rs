use crate::session::AuthState;
use crate::upload::{FileState, UploadProgress, NO_CAMERA};

/// Latest snapshots the window renders from.
#[derive(Default)]
pub struct ViewState {
    pub auth: AuthState,
    pub progress: UploadProgress,
    pub is_uploading: bool,
    pub camera: Option<String>,
    pub initials: Option<String>,
    pub show_details: bool,
    pub error_message: Option<String>,
}

impl ViewState {
    pub fn device_label(&self) -> &str {
        self.camera.as_deref().unwrap_or(NO_CAMERA)
    }

    /// "AB  jane@openspace.ai" style label for the signed-in account.
    pub fn account_label(&self) -> Option<String> {
        let user = self.auth.user()?;
        Some(match self.initials.as_deref().filter(|i| !i.trim().is_empty()) {
            Some(initials) => format!("{}  {}", initials, user.display_name()),
            None => user.display_name().to_string(),
        })
    }

    pub fn can_upload(&self) -> bool {
        self.auth.is_logged_in() && !self.is_uploading
    }

    /// Fraction of known files that reached a terminal state.
    pub fn overall_fraction(&self) -> f32 {
        let total = self.progress.uploads.len();
        if total == 0 {
            return 0.0;
        }
        let done = self
            .progress
            .uploads
            .values()
            .filter(|u| u.status.is_terminal())
            .count();
        done as f32 / total as f32
    }

    pub fn status_text(&self) -> String {
        if self.progress.is_empty() {
            return String::new();
        }
        format!(
            "Files: {} | ✅ Completed: {} | ⏩ Skipped: {} | ❌ Failed: {}",
            self.progress.uploads.len(),
            self.progress.count(FileState::Completed),
            self.progress.skipped_count,
            self.progress.count(FileState::Failed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::UserInfo;
    use crate::upload::UploadStatus;

    fn entry(name: &str, state: FileState) -> UploadStatus {
        UploadStatus {
            status: state,
            ..UploadStatus::new(name)
        }
    }

    #[test]
    fn empty_session_has_no_status() {
        let view = ViewState::default();
        assert_eq!(view.status_text(), "");
        assert_eq!(view.overall_fraction(), 0.0);
        assert_eq!(view.device_label(), NO_CAMERA);
    }

    #[test]
    fn summarises_terminal_files() {
        let mut view = ViewState::default();
        for (name, state) in [
            ("a.jpg", FileState::Completed),
            ("b.jpg", FileState::Failed),
            ("c.jpg", FileState::Uploading),
            ("d.jpg", FileState::Completed),
        ] {
            view.progress
                .uploads
                .insert(name.to_string(), entry(name, state));
        }
        view.progress.skipped_count = 2;

        assert_eq!(view.overall_fraction(), 0.75);
        assert_eq!(
            view.status_text(),
            "Files: 4 | ✅ Completed: 2 | ⏩ Skipped: 2 | ❌ Failed: 1"
        );
    }

    #[test]
    fn account_label_prefers_initials() {
        let mut view = ViewState {
            initials: Some("JD".to_string()),
            ..ViewState::default()
        };
        assert_eq!(view.account_label(), None);

        view.auth = AuthState::LoggedIn {
            user: UserInfo {
                email: "jane@openspace.ai".to_string(),
                full_name: Some("Jane Doe".to_string()),
            },
        };
        assert_eq!(view.account_label().as_deref(), Some("JD  Jane Doe"));

        view.initials = None;
        assert_eq!(view.account_label().as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn upload_requires_login_and_idle() {
        let mut view = ViewState::default();
        assert!(!view.can_upload());

        view.auth = AuthState::LoggedIn {
            user: UserInfo {
                email: "a@b.com".to_string(),
                full_name: None,
            },
        };
        assert!(view.can_upload());

        view.is_uploading = true;
        assert!(!view.can_upload());
    }
}

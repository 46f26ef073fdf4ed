use super::TacticUploader;
use crate::session::AuthState;
use crate::upload::{FileState, UploadStatus};
use crate::utils::format::format_transfer;
use eframe::egui::{self, Align, Color32, RichText};

const ACCENT: Color32 = Color32::from_rgb(161, 89, 225);
const SUCCESS: Color32 = Color32::from_rgb(0, 180, 0);
const FAILURE: Color32 = Color32::from_rgb(220, 50, 50);
const MUTED: Color32 = Color32::from_rgb(150, 150, 150);

impl TacticUploader {
    pub fn render(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let footer_height = 40.0;
            let content_height = ui.available_height() - footer_height;

            egui::ScrollArea::vertical()
                .max_height(content_height)
                .show(ui, |ui| {
                    ui.add_space(20.0);
                    self.render_header(ui);
                    ui.add_space(20.0);

                    ui.group(|ui| {
                        ui.horizontal(|ui| {
                            ui.label("📷");
                            ui.label(self.state.device_label());
                            if ui.small_button("⟳").on_hover_text("Look for a camera").clicked() {
                                self.refresh_camera();
                            }
                        });
                    });

                    ui.add_space(20.0);

                    ui.vertical_centered(|ui| {
                        let label = if self.state.is_uploading {
                            "⏳ Uploading..."
                        } else {
                            "📤 Upload Camera Files"
                        };
                        let can_upload = self.state.can_upload();
                        ui.add_enabled_ui(can_upload, |ui| {
                            let button = egui::Button::new(label).min_size(egui::vec2(200.0, 40.0));
                            if ui.add(button).clicked() {
                                self.start_upload();
                            }
                        });
                    });

                    if !self.state.progress.is_empty() {
                        ui.add_space(20.0);
                        ui.group(|ui| {
                            let progress_bar = egui::ProgressBar::new(self.state.overall_fraction())
                                .show_percentage()
                                .animate(self.state.is_uploading)
                                .fill(ACCENT);
                            ui.add(progress_bar);
                            ui.label(self.state.status_text());
                        });

                        ui.add_space(10.0);
                        self.render_details(ui);
                    }

                    ui.add_space(20.0);
                });

            ui.with_layout(egui::Layout::bottom_up(Align::Center), |ui| {
                ui.add_space(10.0);
                self.render_footer(ui);
            });
        });
    }

    fn render_header(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.heading("OpenSpace Camera Upload");
            ui.add_space(5.0);

            match self.state.auth.clone() {
                AuthState::LoggedOut => {
                    ui.label(
                        RichText::new("Sign in to upload captures")
                            .color(ui.visuals().text_color().gamma_multiply(0.7)),
                    );
                    ui.add_space(8.0);
                    if ui.button("🔑 Log in").clicked() {
                        self.login();
                    }
                }
                AuthState::LoggingIn => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Waiting for login...");
                    });
                }
                AuthState::LoggedIn { user } => {
                    let account = self
                        .state
                        .account_label()
                        .unwrap_or_else(|| user.display_name().to_string());
                    ui.label(RichText::new(format!("👤 {}", account)).strong());
                    ui.add_space(8.0);
                    ui.add_enabled_ui(!self.state.is_uploading, |ui| {
                        if ui.button("Log out").clicked() {
                            self.logout();
                        }
                    });
                }
            }
        });
    }

    fn render_details(&mut self, ui: &mut egui::Ui) {
        if ui
            .button(if self.state.show_details {
                "Hide Details"
            } else {
                "Show Details"
            })
            .clicked()
        {
            self.state.show_details = !self.state.show_details;
        }

        if !self.state.show_details {
            return;
        }

        egui::ScrollArea::vertical()
            .id_source("upload_details")
            .max_height(240.0)
            .show(ui, |ui| {
                egui::Frame::none()
                    .fill(ui.style().visuals.extreme_bg_color)
                    .show(ui, |ui| {
                        ui.add_space(8.0);
                        for upload in self.state.progress.sorted() {
                            render_upload_row(ui, upload);
                            ui.add_space(4.0);
                        }
                        if self.state.progress.skipped_count > 0 {
                            ui.colored_label(
                                MUTED,
                                format!(
                                    "⏩ {} file(s) already uploaded, skipped",
                                    self.state.progress.skipped_count
                                ),
                            );
                        }
                        ui.add_space(8.0);
                    });
            });
    }

    fn render_footer(&mut self, ui: &mut egui::Ui) {
        if let Some(error) = &self.state.error_message {
            ui.colored_label(FAILURE, error);
            ui.add_space(5.0);
        }

        ui.horizontal(|ui| {
            let idle = !self.state.is_uploading;
            ui.add_enabled_ui(idle, |ui| {
                if ui
                    .button("🗑 Clear Cache")
                    .on_hover_text("Forget the login and the uploaded-files cache")
                    .clicked()
                {
                    self.delete_data();
                }
            });
        });
    }
}

fn render_upload_row(ui: &mut egui::Ui, upload: &UploadStatus) {
    let (icon, color) = match upload.status {
        FileState::Pending => ("⏳", MUTED),
        FileState::Uploading => ("📤", ACCENT),
        FileState::Completed => ("✅", SUCCESS),
        FileState::Skipped => ("⏩", MUTED),
        FileState::Failed => ("❌", FAILURE),
    };

    ui.horizontal(|ui| {
        ui.label(icon);
        match &upload.error {
            Some(error) => ui.colored_label(color, format!("{} - {}", upload.filename, error)),
            None => ui.colored_label(color, &upload.filename),
        };
        ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
            ui.label(
                RichText::new(format_transfer(upload.bytes_uploaded, upload.total_bytes))
                    .color(MUTED),
            );
        });
    });

    if upload.status == FileState::Uploading {
        ui.add(
            egui::ProgressBar::new((upload.percentage / 100.0) as f32)
                .desired_width(ui.available_width())
                .fill(ACCENT),
        );
    }
}

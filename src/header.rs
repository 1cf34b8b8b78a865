use std::path::{Path, PathBuf};

use crate::language::{Translatable, Translations, UNMANAGED_ID};

/// Word shown while no media is loaded.
pub const NO_FILE_ID: &str = "nofileselected";
pub const HEADER_HEIGHT: f32 = 20.0;

/// One-line strip above the video showing the loaded file.
#[derive(Debug, Clone)]
pub struct Header {
    file: Option<PathBuf>,
    text: String,
}

impl Header {
    pub fn new(file: Option<PathBuf>, translations: &Translations) -> Self {
        let mut header = Self {
            file: None,
            text: String::new(),
        };
        header.set_file(file, translations);
        header
    }

    pub fn set_file(&mut self, file: Option<PathBuf>, translations: &Translations) {
        self.text = match &file {
            Some(path) => path.display().to_string(),
            None => translations.text_for(NO_FILE_ID).to_string(),
        };
        self.file = file;
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        ui.allocate_ui(egui::vec2(ui.available_width(), HEADER_HEIGHT), |ui| {
            ui.vertical_centered(|ui| {
                ui.add(egui::Label::new(self.text.as_str()).selectable(true).truncate())
                    .on_hover_text(self.text.as_str());
            });
        });
    }
}

impl Translatable for Header {
    fn id(&self) -> &str {
        if self.file.is_some() {
            UNMANAGED_ID
        } else {
            NO_FILE_ID
        }
    }

    fn apply_text(&mut self, text: String) {
        self.text = text;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::retranslate_item;

    fn translations(code: &str) -> Translations {
        let mut translations = Translations::from_json(
            r#"{"nofileselected": {"en": "No file selected", "it": "Nessun file selezionato"}}"#,
        )
        .unwrap();
        translations.select(Some(code));
        translations
    }

    #[test]
    fn test_empty_header_is_translated() {
        let english = translations("en");
        let mut header = Header::new(None, &english);
        assert_eq!(header.text(), "No file selected");

        let italian = translations("it");
        assert!(retranslate_item(&mut header, &italian));
        assert_eq!(header.text(), "Nessun file selezionato");
    }

    #[test]
    fn test_file_path_is_never_translated() {
        let english = translations("en");
        let path = PathBuf::from("/videos/cat.mp4");
        let mut header = Header::new(Some(path.clone()), &english);
        assert_eq!(header.text(), path.display().to_string());

        assert!(!retranslate_item(&mut header, &translations("it")));
        assert_eq!(header.text(), path.display().to_string());
        assert_eq!(header.file(), Some(path.as_path()));
    }
}

use crate::language::{TextHandle, TranslationRegistry, Translations};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageAction {
    /// A language button was clicked: switch live, nothing saved yet.
    Choose(String),
    Confirm,
    Cancel,
}

/// Modal listing one button per vocabulary language.
#[derive(Debug)]
pub struct LanguageSelector {
    open: bool,
    original: Option<String>,
    title: TextHandle,
    ok: TextHandle,
    ok_tip: TextHandle,
    cancel: TextHandle,
    cancel_tip: TextHandle,
    languages: Vec<(String, TextHandle)>,
}

impl LanguageSelector {
    pub fn new(registry: &mut TranslationRegistry, translations: &Translations) -> Self {
        let languages = translations
            .languages()
            .iter()
            .map(|code| (code.clone(), registry.register(code, translations)))
            .collect();

        Self {
            open: false,
            original: None,
            title: registry.register("language", translations),
            ok: registry.register("ok", translations),
            ok_tip: registry.register("okaylingua", translations),
            cancel: registry.register("cancel", translations),
            cancel_tip: registry.register("canclingua", translations),
            languages,
        }
    }

    /// Opens the dialog and remembers the language to restore on cancel.
    pub fn open(&mut self, translations: &Translations) {
        self.open = true;
        self.original = translations.selected().map(str::to_string);
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    #[cfg(test)]
    fn original(&self) -> Option<&str> {
        self.original.as_deref()
    }

    /// Closes the dialog, handing back the language active when it opened.
    pub fn close(&mut self) -> Option<String> {
        self.open = false;
        self.original.take()
    }

    pub fn show(
        &self,
        ctx: &egui::Context,
        registry: &TranslationRegistry,
        selected: Option<&str>,
    ) -> Option<LanguageAction> {
        if !self.open {
            return None;
        }

        let mut action = None;
        egui::Window::new(registry.text(self.title))
            .id(egui::Id::new("language_selector"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.vertical_centered_justified(|ui| {
                    for (code, handle) in &self.languages {
                        let chosen = selected == Some(code.as_str());
                        if ui
                            .selectable_label(chosen, registry.text(*handle))
                            .clicked()
                        {
                            action = Some(LanguageAction::Choose(code.clone()));
                        }
                    }
                });
                ui.separator();
                ui.horizontal(|ui| {
                    if ui
                        .button(registry.text(self.ok))
                        .on_hover_text(registry.text(self.ok_tip))
                        .clicked()
                    {
                        action = Some(LanguageAction::Confirm);
                    }
                    if ui
                        .button(registry.text(self.cancel))
                        .on_hover_text(registry.text(self.cancel_tip))
                        .clicked()
                    {
                        action = Some(LanguageAction::Cancel);
                    }
                });
            });
        action
    }
}

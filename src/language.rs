use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::settings::Settings;

/// Shown for any word that cannot be translated.
pub const PLACEHOLDER: &str = "--";
/// Returned by [`Translations::id_for`] for text that is not a managed translation.
pub const UNMANAGED_ID: &str = "id";

#[derive(Error, Debug)]
pub enum LanguageError {
    #[error("Vocabulary {} is not readable: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed vocabulary: {0}")]
    Malformed(String),
}

pub fn vocabulary_path(read_only_root: &Path) -> PathBuf {
    read_only_root.join("config").join("vocabulary.json")
}

#[derive(Debug, Clone)]
struct Word {
    id: String,
    texts: Vec<(String, String)>,
}

impl Word {
    fn text(&self, language: &str) -> Option<&str> {
        self.texts
            .iter()
            .find(|(code, _)| code == language)
            .map(|(_, text)| text.as_str())
    }
}

/// The word dictionary plus the currently selected language.
#[derive(Debug, Clone)]
pub struct Translations {
    words: Vec<Word>,
    index: HashMap<String, usize>,
    languages: Vec<String>,
    selected: Option<String>,
    previous: Option<String>,
}

impl Translations {
    pub fn load(read_only_root: &Path) -> Result<Self, LanguageError> {
        let path = vocabulary_path(read_only_root);
        let text = fs::read_to_string(&path).map_err(|source| LanguageError::Read {
            path: path.clone(),
            source,
        })?;
        let translations = Self::from_json(&text)?;
        debug!(
            "Loaded {} words in {:?} from {}",
            translations.words.len(),
            translations.languages,
            path.display()
        );
        Ok(translations)
    }

    /// Parses a vocabulary. Recognized languages are the keys of the first word.
    pub fn from_json(text: &str) -> Result<Self, LanguageError> {
        let root: serde_json::Map<String, Value> = serde_json::from_str(text)?;

        let mut words = Vec::with_capacity(root.len());
        for (id, value) in root {
            let Value::Object(entries) = value else {
                return Err(LanguageError::Malformed(format!(
                    "word {} is not an object",
                    id
                )));
            };
            let mut texts = Vec::with_capacity(entries.len());
            for (code, text) in entries {
                match text {
                    Value::String(text) => texts.push((code, text)),
                    _ => {
                        return Err(LanguageError::Malformed(format!(
                            "word {} has a non-string {} entry",
                            id, code
                        )))
                    }
                }
            }
            words.push(Word { id, texts });
        }

        let languages: Vec<String> = words
            .first()
            .map(|word| word.texts.iter().map(|(code, _)| code.clone()).collect())
            .ok_or_else(|| LanguageError::Malformed("vocabulary is empty".to_string()))?;
        if languages.is_empty() {
            return Err(LanguageError::Malformed(
                "first word lists no languages".to_string(),
            ));
        }

        let index = words
            .iter()
            .enumerate()
            .map(|(i, word)| (word.id.clone(), i))
            .collect();

        Ok(Self {
            words,
            index,
            languages,
            selected: None,
            previous: None,
        })
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    #[cfg(test)]
    fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    pub fn is_known_language(&self, code: &str) -> bool {
        self.languages.iter().any(|l| l == code)
    }

    /// Selects `code`; an unknown code (or `None`) leaves nothing selected.
    pub fn select(&mut self, code: Option<&str>) {
        self.previous = self.selected.take();
        self.selected = code
            .filter(|code| self.is_known_language(code))
            .map(str::to_string);
        if self.selected.is_none() {
            warn!("Language {:?} is not available, translations disabled", code);
        }
    }

    /// Startup selection: the saved language, or the first one in the vocabulary.
    pub fn select_initial(&mut self, settings: &Settings) {
        let code = if self.is_known_language(&settings.language) {
            Some(settings.language.clone())
        } else {
            self.languages.first().cloned()
        };
        self.select(code.as_deref());
    }

    /// Goes back to the language that was active before the last selection.
    pub fn rollback(&mut self) {
        let previous = self.previous.clone();
        self.select(previous.as_deref());
    }

    pub fn text_for(&self, id: &str) -> &str {
        let Some(language) = self.selected.as_deref() else {
            return PLACEHOLDER;
        };
        self.index
            .get(id)
            .and_then(|&i| self.words[i].text(language))
            .unwrap_or(PLACEHOLDER)
    }

    pub fn id_for(&self, text: &str) -> &str {
        self.words
            .iter()
            .find(|word| word.texts.iter().any(|(_, t)| t == text))
            .map(|word| word.id.as_str())
            .unwrap_or(UNMANAGED_ID)
    }
}

/// A piece of UI text that follows the selected language.
pub trait Translatable {
    /// Word-id of the current text, or [`UNMANAGED_ID`] when it is not a translation.
    fn id(&self) -> &str;

    fn apply_text(&mut self, text: String);
}

/// Re-applies one element; unmanaged elements are left alone.
pub fn retranslate_item(item: &mut dyn Translatable, translations: &Translations) -> bool {
    if item.id() == UNMANAGED_ID {
        return false;
    }
    let text = translations.text_for(item.id()).to_string();
    item.apply_text(text);
    true
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    id: String,
    text: String,
}

impl Label {
    pub fn new(id: &str, translations: &Translations) -> Self {
        Self {
            id: id.to_string(),
            text: translations.text_for(id).to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Translatable for Label {
    fn id(&self) -> &str {
        &self.id
    }

    fn apply_text(&mut self, text: String) {
        self.text = text;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextHandle(usize);

/// Every translatable text of the window, registered at creation time.
#[derive(Debug, Default)]
pub struct TranslationRegistry {
    labels: Vec<Label>,
}

impl TranslationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: &str, translations: &Translations) -> TextHandle {
        self.labels.push(Label::new(id, translations));
        TextHandle(self.labels.len() - 1)
    }

    pub fn text(&self, handle: TextHandle) -> &str {
        self.labels
            .get(handle.0)
            .map(Label::text)
            .unwrap_or(PLACEHOLDER)
    }

    pub fn id(&self, handle: TextHandle) -> &str {
        self.labels
            .get(handle.0)
            .map(|label| label.id())
            .unwrap_or(UNMANAGED_ID)
    }

    /// Points an existing text at another word, e.g. play/pause tooltips.
    pub fn rebind(&mut self, handle: TextHandle, id: &str, translations: &Translations) {
        if let Some(label) = self.labels.get_mut(handle.0) {
            *label = Label::new(id, translations);
        }
    }

    /// Re-applies the selected language to every registered text and to `extra`.
    ///
    /// Returns how many elements were updated.
    pub fn retranslate(
        &mut self,
        translations: &Translations,
        extra: &mut [&mut dyn Translatable],
    ) -> usize {
        let mut updated = 0;
        for label in &mut self.labels {
            if retranslate_item(label, translations) {
                updated += 1;
            }
        }
        for item in extra.iter_mut() {
            if retranslate_item(&mut **item, translations) {
                updated += 1;
            }
        }
        debug!("Retranslated {} texts to {:?}", updated, translations.selected());
        updated
    }
}

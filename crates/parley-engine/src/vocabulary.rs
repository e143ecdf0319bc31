//! Word lists shared by the pattern strategy and the context rules.
//!
//! Everything here works on text already passed through
//! [`parley_common::normalize`].

use std::collections::HashMap;
use strsim::jaro_winkler;

const FUZZY_APP_THRESHOLD: f64 = 0.92;
const FUZZY_MIN_TOKEN_LEN: usize = 4;

/// Verb and domain vocabulary for one language.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    pub open_verbs: Vec<String>,
    pub close_verbs: Vec<String>,
    pub play_verbs: Vec<String>,
    pub pause_verbs: Vec<String>,
    pub send_verbs: Vec<String>,
    pub music_terms: Vec<String>,
    pub app_terms: Vec<String>,
    pub email_terms: Vec<String>,
    pub sms_terms: Vec<String>,
    pub device_terms: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Lexicon {
    pub fn english() -> Self {
        Self {
            open_verbs: words(&["open", "launch", "fire up", "bring up"]),
            close_verbs: words(&["close", "quit", "exit", "kill", "shut down", "stop"]),
            play_verbs: words(&["play", "put on", "listen to", "resume"]),
            pause_verbs: words(&["pause", "stop the music", "stop playing", "mute the music"]),
            send_verbs: words(&["send", "write", "text", "email", "message"]),
            music_terms: words(&[
                "music", "song", "songs", "track", "album", "playlist", "artist", "jazz", "rock",
                "pop", "classical", "radio", "tunes",
            ]),
            app_terms: words(&["app", "application", "program", "window"]),
            email_terms: words(&["email", "e mail", "mail", "inbox"]),
            sms_terms: words(&["sms", "text", "text message"]),
            device_terms: words(&[
                "volume",
                "brightness",
                "wifi",
                "bluetooth",
                "screen",
                "shutdown",
                "restart",
            ]),
        }
    }

    pub fn spanish() -> Self {
        Self {
            open_verbs: words(&["abre", "abrir", "inicia", "iniciar", "ejecuta", "lanza"]),
            close_verbs: words(&["cierra", "cerrar", "termina", "salir de"]),
            play_verbs: words(&["reproduce", "reproducir", "pon", "poner", "escuchar"]),
            pause_verbs: words(&["pausa", "pausar", "deten la musica", "para la musica"]),
            send_verbs: words(&["envia", "enviar", "manda", "mandar", "escribe"]),
            music_terms: words(&[
                "musica", "música", "cancion", "canción", "canciones", "album", "álbum",
                "lista", "artista", "radio",
            ]),
            app_terms: words(&["app", "aplicacion", "aplicación", "programa", "ventana"]),
            email_terms: words(&["correo", "email", "mail"]),
            sms_terms: words(&["sms", "mensaje", "mensaje de texto"]),
            device_terms: words(&["volumen", "brillo", "wifi", "bluetooth", "pantalla"]),
        }
    }
}

/// Lowercased primary subtag of a language code: `ES-mx` becomes `es`.
pub fn primary_language(language: &str) -> String {
    language
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Whether `text` contains any of `phrases` as whole words.
pub fn contains_any(text: &str, phrases: &[String]) -> bool {
    first_match(text, phrases).is_some()
}

/// First phrase from `phrases` found in `text` as whole words.
pub fn first_match<'a>(text: &str, phrases: &'a [String]) -> Option<&'a str> {
    let padded = format!(" {} ", text);
    phrases
        .iter()
        .find(|p| padded.contains(&format!(" {} ", p)))
        .map(String::as_str)
}

#[derive(Debug, Clone)]
pub struct Vocabulary {
    applications: Vec<String>,
    music_applications: Vec<String>,
    lexicons: HashMap<String, Lexicon>,
    fallback: Lexicon,
}

impl Default for Vocabulary {
    fn default() -> Self {
        let config = crate::config::ContextConfig::default();
        Self::new(config.known_applications, config.music_applications)
    }
}

impl Vocabulary {
    pub fn new(applications: Vec<String>, music_applications: Vec<String>) -> Self {
        let mut lexicons = HashMap::new();
        lexicons.insert("en".to_string(), Lexicon::english());
        lexicons.insert("es".to_string(), Lexicon::spanish());

        let mut applications = applications;
        for app in &music_applications {
            if !applications.iter().any(|a| a.eq_ignore_ascii_case(app)) {
                applications.push(app.clone());
            }
        }

        Self {
            applications,
            music_applications,
            lexicons,
            fallback: Lexicon::english(),
        }
    }

    pub fn with_lexicon(mut self, language: &str, lexicon: Lexicon) -> Self {
        self.lexicons.insert(language.to_string(), lexicon);
        self
    }

    /// Lexicon for a language code such as `en` or `es-MX`; English otherwise.
    pub fn lexicon(&self, language: &str) -> &Lexicon {
        self.lexicons
            .get(&primary_language(language))
            .unwrap_or(&self.fallback)
    }

    pub fn applications(&self) -> &[String] {
        &self.applications
    }

    /// Find a known application named in normalized `text`.
    ///
    /// Exact whole-word matches win; otherwise single-word names are matched
    /// fuzzily against individual tokens to absorb transcription errors.
    pub fn find_application(&self, text: &str) -> Option<String> {
        let padded = format!(" {} ", text);
        let exact = self
            .applications
            .iter()
            .filter(|app| padded.contains(&format!(" {} ", app.to_lowercase())))
            .max_by_key(|app| app.len());
        if let Some(app) = exact {
            return Some(app.clone());
        }

        let mut best: Option<(&String, f64)> = None;
        for token in text.split_whitespace() {
            if token.chars().count() < FUZZY_MIN_TOKEN_LEN {
                continue;
            }
            for app in self.applications.iter().filter(|a| !a.contains(' ')) {
                let score = jaro_winkler(&app.to_lowercase(), token);
                if score >= FUZZY_APP_THRESHOLD && best.is_none_or(|(_, s)| score > s) {
                    best = Some((app, score));
                }
            }
        }
        best.map(|(app, _)| app.clone())
    }

    pub fn is_music_application(&self, name: &str) -> bool {
        self.music_applications
            .iter()
            .any(|a| a.eq_ignore_ascii_case(name))
    }
}

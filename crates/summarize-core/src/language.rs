//! Normalizes free-form language tags/names (`"en"`, `"English"`, `"pt-BR"`,
//! `"Brazilian Portuguese"`) to a stable `{tag, label}` pair. Unrecognized
//! input is not an error: the sanitized label is passed straight through to
//! the model, per §4.7 step 1.

use crate::ResolvedLanguage;

struct LanguageEntry {
    tag: &'static str,
    label: &'static str,
    aliases: &'static [&'static str],
}

const LANGUAGES: &[LanguageEntry] = &[
    LanguageEntry { tag: "en", label: "English", aliases: &["english", "en-us", "en-gb"] },
    LanguageEntry { tag: "es", label: "Spanish", aliases: &["spanish", "espanol", "español"] },
    LanguageEntry { tag: "fr", label: "French", aliases: &["french", "francais", "français"] },
    LanguageEntry { tag: "de", label: "German", aliases: &["german", "deutsch"] },
    LanguageEntry { tag: "it", label: "Italian", aliases: &["italian", "italiano"] },
    LanguageEntry { tag: "pt", label: "Portuguese", aliases: &["portuguese", "portugues"] },
    LanguageEntry { tag: "pt-br", label: "Brazilian Portuguese", aliases: &["brazilian portuguese", "portugues brasileiro"] },
    LanguageEntry { tag: "ru", label: "Russian", aliases: &["russian", "russkiy"] },
    LanguageEntry { tag: "zh", label: "Chinese", aliases: &["chinese", "mandarin", "zh-cn", "zh-hans"] },
    LanguageEntry { tag: "ja", label: "Japanese", aliases: &["japanese", "nihongo"] },
    LanguageEntry { tag: "ko", label: "Korean", aliases: &["korean", "hangugeo"] },
    LanguageEntry { tag: "ar", label: "Arabic", aliases: &["arabic"] },
    LanguageEntry { tag: "hi", label: "Hindi", aliases: &["hindi"] },
    LanguageEntry { tag: "nl", label: "Dutch", aliases: &["dutch", "nederlands"] },
    LanguageEntry { tag: "pl", label: "Polish", aliases: &["polish", "polski"] },
    LanguageEntry { tag: "tr", label: "Turkish", aliases: &["turkish", "turkce"] },
    LanguageEntry { tag: "vi", label: "Vietnamese", aliases: &["vietnamese", "tieng viet"] },
    LanguageEntry { tag: "id", label: "Indonesian", aliases: &["indonesian", "bahasa indonesia"] },
    LanguageEntry { tag: "sv", label: "Swedish", aliases: &["swedish", "svenska"] },
    LanguageEntry { tag: "uk", label: "Ukrainian", aliases: &["ukrainian"] },
];

fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Resolve a free-form language string. Returns the known `{tag,label}`
/// pair on a match; otherwise returns a pass-through entry whose `tag`
/// equals the sanitized input and whose `label` is the original trimmed
/// text — the orchestrator forwards this unchanged to the model instead
/// of treating it as an error.
pub fn resolve(raw: &str) -> ResolvedLanguage {
    let key = normalize_key(raw);
    if key.is_empty() {
        return ResolvedLanguage {
            tag: "en".to_string(),
            label: "English".to_string(),
        };
    }
    for entry in LANGUAGES {
        if entry.tag == key || entry.aliases.contains(&key.as_str()) {
            return ResolvedLanguage {
                tag: entry.tag.to_string(),
                label: entry.label.to_string(),
            };
        }
    }
    ResolvedLanguage {
        tag: key,
        label: raw.trim().to_string(),
    }
}

/// Whether `raw` resolves to one of the built-in languages (vs. a
/// pass-through label).
pub fn is_known(raw: &str) -> bool {
    let key = normalize_key(raw);
    LANGUAGES.iter().any(|e| e.tag == key || e.aliases.contains(&key.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_alias() {
        let r = resolve("Français");
        assert_eq!(r.tag, "fr");
        assert_eq!(r.label, "French");
    }

    #[test]
    fn resolves_tag_directly() {
        let r = resolve("pt-BR");
        assert_eq!(r.tag, "pt-br");
        assert_eq!(r.label, "Brazilian Portuguese");
    }

    #[test]
    fn passes_through_unknown() {
        let r = resolve("Klingon");
        assert_eq!(r.tag, "klingon");
        assert_eq!(r.label, "Klingon");
        assert!(!is_known("Klingon"));
    }

    #[test]
    fn resolve_is_idempotent_on_label() {
        let r1 = resolve("english");
        let r2 = resolve(&r1.label);
        assert_eq!(r1.tag, r2.tag);
    }
}

use unicode_normalization::UnicodeNormalization;

/// Sentence-final marks stripped before matching (ASCII and full-width forms).
const TERMINAL_PUNCTUATION: &[char] = &['。', '．', '.', '！', '!', '？', '?', '、', '，', ',', '…'];

/// First and last katakana that have a hiragana counterpart (ァ..ヶ).
const KATAKANA_START: u32 = 0x30A1;
const KATAKANA_END: u32 = 0x30F6;
/// Distance between a katakana code point and its hiragana twin.
const KANA_OFFSET: u32 = 0x60;

/// Canonicalize a recognizer transcript for substring matching.
///
/// Compatibility forms are unified first (NFKC), so half-width katakana and
/// full-width Latin meet their ordinary forms. Whitespace and sentence-final
/// punctuation are then removed, the text is lowercased, and katakana is
/// folded onto hiragana so that "タロ", "ﾀﾛ" and "たろ" compare equal.
/// Idempotent: the result is recomposed (NFC) after characters are dropped.
pub fn normalize(raw: &str) -> String {
    raw.nfkc()
        .filter(|c| !c.is_whitespace())
        .filter(|c| !TERMINAL_PUNCTUATION.contains(c))
        .flat_map(char::to_lowercase)
        .map(fold_kana)
        .nfc()
        .collect()
}

fn fold_kana(c: char) -> char {
    let code = c as u32;
    if (KATAKANA_START..=KATAKANA_END).contains(&code) {
        char::from_u32(code - KANA_OFFSET).unwrap_or(c)
    } else {
        c
    }
}

//! Post-recognition drug-name correction.
//!
//! Fuzzy-matches words against a fixed formulary to repair common OCR errors
//! in medication names ("Paracetam0l", "Amoxicilin"). Corrections are
//! conservative: the word must be at least 5 characters, within edit
//! distance 2 of exactly one dictionary term, and the original
//! capitalization pattern is kept.

/// Common drugs on the Vietnamese retail market, lowercase and sorted for
/// binary search.
const FORMULARY: &[&str] = &[
    "acetylcysteine",
    "alphachymotrypsin",
    "amlodipine",
    "amoxicillin",
    "atorvastatin",
    "augmentin",
    "azithromycin",
    "berberin",
    "betahistine",
    "bromhexine",
    "cefixime",
    "cefuroxime",
    "cetirizine",
    "clarithromycin",
    "dexamethasone",
    "diclofenac",
    "domperidone",
    "enalapril",
    "esomeprazole",
    "fexofenadine",
    "gliclazide",
    "ibuprofen",
    "loperamide",
    "loratadine",
    "losartan",
    "meloxicam",
    "metformin",
    "methylprednisolone",
    "metronidazole",
    "nifedipine",
    "omeprazole",
    "oresol",
    "pantoprazole",
    "paracetamol",
    "prednisolone",
    "rabeprazole",
    "salbutamol",
    "simvastatin",
    "spiramycin",
    "telmisartan",
];

/// Repair drug names in free text. Words that are not close, unambiguous
/// matches to a formulary term pass through untouched.
pub fn correct_drug_names(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            word.push(ch);
        } else {
            flush_word(&mut out, &mut word);
            out.push(ch);
        }
    }
    flush_word(&mut out, &mut word);
    out
}

fn flush_word(out: &mut String, word: &mut String) {
    if word.is_empty() {
        return;
    }
    out.push_str(&correct_word(word));
    word.clear();
}

fn correct_word(word: &str) -> String {
    if word.chars().count() < 5 {
        return word.to_string();
    }

    let lower = word.to_lowercase();
    if FORMULARY.binary_search(&lower.as_str()).is_ok() {
        return word.to_string();
    }

    let word_len = lower.chars().count() as i64;
    let mut best: Option<&str> = None;
    let mut best_dist = 3u32;
    let mut tied = false;

    for &term in FORMULARY {
        if (word_len - term.chars().count() as i64).unsigned_abs() > 2 {
            continue;
        }
        let dist = levenshtein(&lower, term);
        if dist < best_dist {
            best_dist = dist;
            best = Some(term);
            tied = false;
        } else if dist == best_dist && best.is_some() {
            tied = true;
        }
    }

    match best {
        Some(term) if !tied => apply_case_pattern(word, term),
        _ => word.to_string(),
    }
}

/// Reapply the original word's capitalization to the corrected term.
fn apply_case_pattern(original: &str, corrected: &str) -> String {
    if original.chars().all(|c| !c.is_lowercase()) {
        return corrected.to_uppercase();
    }
    if original.chars().next().is_some_and(|c| c.is_uppercase()) {
        let mut chars = corrected.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
    }
    corrected.to_string()
}

fn levenshtein(a: &str, b: &str) -> u32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len() as u32;
    }
    if b.is_empty() {
        return a.len() as u32;
    }

    let mut prev: Vec<u32> = (0..=b.len() as u32).collect();
    let mut curr = vec![0u32; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = (i + 1) as u32;
        for (j, &cb) in b.iter().enumerate() {
            let cost = u32::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formulary_is_sorted_for_binary_search() {
        for pair in FORMULARY.windows(2) {
            assert!(pair[0] < pair[1], "{:?} >= {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn repairs_recognizable_misspellings() {
        assert_eq!(correct_drug_names("Paracetamol"), "Paracetamol");
        assert_eq!(correct_drug_names("Paracetanol"), "Paracetamol");
        assert_eq!(correct_drug_names("Amoxicilin"), "Amoxicillin");
        assert_eq!(correct_drug_names("omeprazol"), "omeprazole");
    }

    #[test]
    fn keeps_case_pattern() {
        assert_eq!(correct_drug_names("PARACETANOL"), "PARACETAMOL");
        assert_eq!(correct_drug_names("paracetanol"), "paracetamol");
        assert_eq!(correct_drug_names("Cefiximi"), "Cefixime");
    }

    #[test]
    fn short_words_never_touched() {
        assert_eq!(correct_drug_names("SL: 14"), "SL: 14");
        assert_eq!(correct_drug_names("sáng"), "sáng");
    }

    #[test]
    fn distant_words_never_touched() {
        assert_eq!(correct_drug_names("Bệnh viện quận 3"), "Bệnh viện quận 3");
        assert_eq!(correct_drug_names("chẩn đoán"), "chẩn đoán");
    }

    #[test]
    fn mixed_line_repairs_only_the_drug() {
        let line = "1. Paracetanol 500mg uống sáng tối";
        assert_eq!(correct_drug_names(line), "1. Paracetamol 500mg uống sáng tối");
    }

    #[test]
    fn levenshtein_sanity() {
        assert_eq!(levenshtein("paracetamol", "paracetamol"), 0);
        assert_eq!(levenshtein("paracetanol", "paracetamol"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
    }
}

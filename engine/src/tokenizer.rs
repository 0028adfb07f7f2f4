use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_]*").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        // Indonesian function words; the corpus is Indonesian news text.
        let words: &[&str] = &[
            "ada", "adalah", "agar", "akan", "antara", "atau", "bagi", "bahwa", "begitu",
            "bisa", "dalam", "dan", "dapat", "dari", "dengan", "di", "dia", "hanya",
            "harus", "hingga", "ia", "ini", "itu", "jika", "juga", "kami", "kamu",
            "karena", "ke", "ketika", "kita", "lagi", "lebih", "masih", "maupun",
            "melalui", "menjadi", "menurut", "mereka", "merupakan", "namun", "nya",
            "oleh", "pada", "para", "pun", "saat", "sampai", "sangat", "saya", "sebagai",
            "sebelum", "sebuah", "secara", "sehingga", "seorang", "seperti", "serta",
            "setelah", "sudah", "tanpa", "telah", "terhadap", "tersebut", "tetapi",
            "tidak", "untuk", "yaitu", "yakni", "yang",
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Tokenize text into normalized terms: NFKC fold, lowercase, split on
/// non-alphanumeric boundaries, drop stopwords. Deterministic; empty or
/// all-punctuation input yields an empty sequence.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized)
        .map(|m| m.as_str())
        .filter(|t| !is_stopword(t))
        .map(str::to_owned)
        .collect()
}

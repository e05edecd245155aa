//! Pinyin transcription over a fixed character table.
//!
//! The table is a closed, curated set of characters common in heritage
//! vocabulary and their frequent speech-recognition confusions (鎏/六/刘,
//! 瓷/词/磁, ...). Characters outside it are kept as-is, so two strings that
//! differ only in unmapped characters are still compared literally.

use super::similarity::similarity;

/// Returns the pinyin syllable (without tone) for `c`, if it is in the table.
#[must_use]
pub const fn syllable(c: char) -> Option<&'static str> {
    let s = match c {
        '鎏' | '刘' | '留' | '流' | '柳' => "liu",
        '金' | '进' | '津' | '今' | '近' => "jin",
        '铜' | '同' | '童' | '通' => "tong",
        '牛' | '纽' | '扭' => "niu",
        '佛' => "fo",
        '福' | '富' => "fu",
        '像' | '象' | '向' | '响' => "xiang",
        '天' | '田' | '甜' => "tian",
        '王' | '望' | '忘' | '旺' => "wang",
        '造' | '早' | '枣' | '燥' => "zao",
        '青' | '清' | '轻' | '情' => "qing",
        '白' | '百' | '摆' | '败' => "bai",
        '瓷' | '词' | '慈' | '磁' => "ci",
        '壶' | '湖' | '胡' | '虎' | '户' => "hu",
        '花' | '华' | '化' | '画' => "hua",
        '瓶' | '平' | '苹' | '评' => "ping",
        '碗' | '万' | '湾' | '完' => "wan",
        '盘' | '判' | '盼' | '攀' => "pan",
        _ => return None,
    };
    Some(s)
}

/// Transcribes `text` char by char, concatenating syllables without
/// separators. Unmapped characters pass through unchanged.
///
/// # Example
///
/// ```rust
/// use heritage_kg::services::fuzzy::to_phonetic;
///
/// assert_eq!(to_phonetic("鎏金铜佛像"), "liujintongfoxiang");
/// assert_eq!(to_phonetic("铜X"), "tongX");
/// ```
#[must_use]
pub fn to_phonetic(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        match syllable(c) {
            Some(s) => out.push_str(s),
            None => out.push(c),
        }
    }
    out
}

/// Similarity of the pinyin transcriptions of `a` and `b`.
#[must_use]
pub fn phonetic_similarity(a: &str, b: &str) -> f64 {
    similarity(&to_phonetic(a), &to_phonetic(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_homophones_transcribe_identically() {
        assert_eq!(to_phonetic("刘金同佛象"), to_phonetic("鎏金铜佛像"));
        assert!((phonetic_similarity("刘金同佛象", "鎏金铜佛像") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unmapped_chars_pass_through() {
        assert_eq!(to_phonetic("故宫"), "故宫");
        assert_eq!(to_phonetic(""), "");
        assert_eq!(syllable('宫'), None);
        assert_eq!(syllable('瓷'), Some("ci"));
    }

    #[test]
    fn test_fo_and_fu_are_distinct() {
        assert_eq!(to_phonetic("佛"), "fo");
        assert_eq!(to_phonetic("福"), "fu");
        assert!(phonetic_similarity("佛", "福") < 1.0);
    }
}

//! Filename construction: the pack-side chunk-file escaping scheme and the
//! extract-side xsampa escaping + `flat`/`devkit` naming conventions.
//! Grounded in `pack_ddb.py::escape_filename` and
//! `extract_wav.py::escape_xsampa`/`create_file_name`.

/// Escapes a phoneme/index string for use as a pack-side path component:
/// lowercase ASCII letters pass through, everything else becomes
/// `%<decimal-codepoint>%`.
pub fn escape_filename(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if ('a'..='z').contains(&ch) {
            out.push(ch);
        } else {
            out.push('%');
            out.push_str(&(ch as u32).to_string());
            out.push('%');
        }
    }
    out
}

/// Escapes an xsampa phoneme symbol for use in an extract-side output
/// filename. `"Sil"` is special-cased to lowercase before the character
/// substitutions run.
pub fn escape_xsampa(xsampa: &str) -> String {
    let xsampa = xsampa.replace("Sil", "sil");
    xsampa
        .replace('\\', "-")
        .replace('/', "~")
        .replace('?', "!")
        .replace(':', ";")
        .replace('<', "(")
        .replace('>', ")")
}

/// Inverse of [`escape_xsampa`], for round-tripping file names back to
/// phoneme symbols.
pub fn unescape_xsampa(escaped: &str) -> String {
    escaped
        .replace('-', "\\")
        .replace('~', "/")
        .replace('!', "?")
        .replace(';', ":")
        .replace('(', "<")
        .replace(')', ">")
}

/// Which output layout extract uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenameStyle {
    Flat,
    Devkit,
}

/// Which kind of phoneme grouping an extracted unit belongs to, used to pick
/// the `sta`/`art`/`tri`/`growl`/`unknown` sub-path and the output filename.
fn snd_group(phonemes: &[String]) -> &'static str {
    match phonemes.len() {
        0 => "unknown",
        1 if phonemes[0] == "growl" => "growl",
        1 => "sta",
        2 => "art",
        3 => "tri",
        _ => "unknown",
    }
}

/// Builds the relative output path (including sub-directories) for one
/// extracted unit, mirroring `extract_wav.py::create_file_name`.
pub fn create_file_name(
    phonemes: &[String],
    style: FilenameStyle,
    classify_index: Option<usize>,
    offset: u64,
    pitch: f32,
    file_type: &str,
) -> String {
    let offset_hex = format!("{offset:08x}");
    let escaped: Vec<String> = phonemes.iter().map(|p| escape_xsampa(p)).collect();
    let pit_str = if pitch >= 0.0 {
        format!("pit+{pitch:.2}")
    } else {
        format!("pit{pitch:.2}")
    };

    if phonemes.is_empty() {
        return format!("unknown_{offset_hex}.{file_type}");
    }

    let group = snd_group(phonemes);
    let phonemes_str = escaped.join(" ");
    let file_type_prefix = if file_type == "lab" { "lab" } else { "wav" };

    match style {
        FilenameStyle::Flat => {
            format!("[{phonemes_str}]_{pit_str}_{offset_hex}.{file_type}")
        }
        FilenameStyle::Devkit => {
            let mut path = format!("{group}/");
            if let Some(idx) = classify_index {
                path.push_str(&format!("{}/", idx + 1));
            }
            path.push_str(&format!("{file_type_prefix}/[{phonemes_str}]_{pit_str}_{offset_hex}.{file_type}"));
            path
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_filename_passes_lowercase_through() {
        assert_eq!(escape_filename("abc"), "abc");
    }

    #[test]
    fn escape_filename_escapes_everything_else() {
        assert_eq!(escape_filename("A1"), "%65%%49%");
    }

    #[test]
    fn xsampa_escape_handles_special_chars_and_sil() {
        assert_eq!(escape_xsampa("Sil"), "sil");
        assert_eq!(escape_xsampa("a\\i"), "a-i");
        assert_eq!(escape_xsampa("a/i"), "a~i");
        assert_eq!(escape_xsampa("a?i"), "a!i");
    }

    #[test]
    fn xsampa_escape_round_trips_through_unescape() {
        let original = "a\\i/u?e:o<x>";
        let escaped = escape_xsampa(original);
        assert_eq!(unescape_xsampa(&escaped), original);
    }

    #[test]
    fn devkit_name_groups_by_phoneme_count() {
        let phonemes = vec!["a".to_string(), "i".to_string()];
        let name = create_file_name(&phonemes, FilenameStyle::Devkit, Some(0), 0x1234abcd, -3.75, "wav");
        assert_eq!(name, "art/wav/[a i]_pit-3.75_1234abcd.wav");
    }

    #[test]
    fn flat_name_has_no_subdirectories() {
        let phonemes = vec!["a".to_string(), "i".to_string()];
        let name = create_file_name(&phonemes, FilenameStyle::Flat, None, 0x1234abcd, -3.75, "wav");
        assert_eq!(name, "[a i]_pit-3.75_1234abcd.wav");
    }

    #[test]
    fn unknown_chunk_name_has_no_brackets() {
        let name = create_file_name(&[], FilenameStyle::Flat, None, 0x5000, 0.0, "wav");
        assert_eq!(name, "unknown_00005000.wav");
    }
}

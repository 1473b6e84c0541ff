//! Label/segmentation file formatting: `.trans`, `.seg`, `.lab`, `.as0`.
//! Pure string formatting, grounded in `utils/seg_utils.py` and
//! `extract_wav.py`'s `generate_art_lab`/`generate_sta_lab`/
//! `generate_art_seg_files`/`generate_sta_seg_files`.

/// Frame-align window size in samples, used to convert a frame index into a
/// sample offset (`extract_wav.py`'s `window_size`).
pub const WINDOW_SIZE: u32 = 512;

/// One phoneme's start/end time pair, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedPhoneme<'a> {
    pub phoneme: &'a str,
    pub start: f64,
    pub end: f64,
}

pub fn nsample2sec(nsample: u64, sample_rate: u32) -> f64 {
    nsample as f64 / sample_rate as f64 / 2.0
}

pub fn frm2sec(frame: u32, sample_rate: u32) -> f64 {
    frame as f64 * WINDOW_SIZE as f64 / sample_rate as f64 / 2.0
}

/// `.trans` file content: the phoneme sequence, plain and bracketed.
pub fn generate_transcription(phonemes: &[TimedPhoneme]) -> String {
    let names: Vec<&str> = phonemes.iter().map(|p| p.phoneme).collect();
    format!("{}\n[{}]", names.join(" "), names.join(" "))
}

/// `.seg` file content: a `Sil`-bracketed phoneme timeline.
pub fn generate_seg(phonemes: &[TimedPhoneme], wav_length: f64, is_sta: bool) -> String {
    let sil_phoneme = if is_sta { "unknown" } else { "Sil" };
    let n_phonemes = phonemes.len() + 2;

    let mut lines = vec![
        format!("nPhonemes {n_phonemes}"),
        format!("articulationsAreStationaries = {}", is_sta as u8),
        "phoneme\t\tBeginTime\t\tEndTime".to_string(),
        "===================================================".to_string(),
    ];

    let first_start = phonemes.first().map(|p| p.start).unwrap_or(0.0);
    lines.push(format!("{sil_phoneme}\t\t{:.6}\t\t{:.6}", 0.0, first_start));

    let mut last_end = 0.0;
    for p in phonemes {
        lines.push(format!("{}\t\t{:.6}\t\t{:.6}", p.phoneme, p.start, p.end));
        last_end = p.end;
    }
    lines.push(format!("{sil_phoneme}\t\t{:.6}\t\t{:.6}", last_end, wav_length));

    lines.join("\n") + "\n"
}

/// One articulation phoneme's voicing classification state, mirroring
/// `seg_utils.py`'s inline `unvoiced_consonant_list` membership test plus the
/// always-unvoiced `Sil`/`Asp`/`?` special cases.
pub fn is_unvoiced(phoneme: &str, unvoiced_consonants: &[String]) -> bool {
    unvoiced_consonants.iter().any(|u| u == phoneme) || matches!(phoneme, "Sil" | "Asp" | "?")
}

/// `.as0` articulation segmentation block.
pub fn generate_articulation_seg(
    phonemes: &[String],
    boundaries: &[f64],
    wav_samples: u64,
    unvoiced_consonants: &[String],
) -> String {
    let mut lines = vec![
        "nphone art segmentation".to_string(),
        "{".to_string(),
        format!("\tphns: [\"{}\"];", phonemes.join("\", \"")),
        "\tcut offset: 0;".to_string(),
        format!("\tcut length: {};", wav_samples / 2),
    ];

    let boundaries_str: Vec<String> = boundaries.iter().map(|b| format!("{b:.9}")).collect();
    lines.push(format!("\tboundaries: [{}];", boundaries_str.join(", ")));
    lines.push("\trevised: false;".to_string());

    let is_triphoneme = phonemes.len() == 3;
    let mut voiced_str = Vec::new();
    for (i, phoneme) in phonemes.iter().enumerate() {
        let voiced = !is_unvoiced(phoneme, unvoiced_consonants);
        voiced_str.push(voiced.to_string());
        if is_triphoneme && i == 1 {
            voiced_str.push(voiced.to_string());
        }
    }
    lines.push(format!("\tvoiced: [{}];", voiced_str.join(", ")));
    lines.push("};".to_string());
    lines.push(String::new());

    lines.join("\n")
}

/// One articulation frame-alignment window, in frame units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameWindow {
    pub start: u32,
    pub end: u32,
}

fn strip_leading_caret(phoneme: &str) -> &str {
    phoneme.strip_prefix('^').unwrap_or(phoneme)
}

/// `.lab` content for an articulation (2- or 3-phoneme) unit. `frame_align`
/// must carry one window per output phoneme (a VCV triphoneme is expanded to
/// 4 phonemes, center repeated, matching the reference's handling).
pub fn generate_art_lab(
    phonemes: &[String],
    frame_align: &[FrameWindow],
    sample_rate: u32,
    offset_bytes: u64,
    total_bytes: u64,
) -> String {
    let offset_time = nsample2sec(offset_bytes, sample_rate) * 1e7;
    let duration_time = nsample2sec(total_bytes, sample_rate) * 1e7;

    let expanded: Vec<String> = if phonemes.len() == 3 {
        let center = strip_leading_caret(&phonemes[1]).to_string();
        vec![phonemes[0].clone(), center.clone(), center, phonemes[2].clone()]
    } else {
        phonemes.to_vec()
    };

    let mut lines = vec![format!("0 {offset_time:.0} sil")];
    let mut last_time = 0.0;
    for (i, phoneme) in expanded.iter().enumerate() {
        let frame = frame_align[i];
        let start_time = offset_time + frm2sec(frame.start, sample_rate) * 1e7;
        let end_time = offset_time + frm2sec(frame.end, sample_rate) * 1e7;
        lines.push(format!("{start_time:.0} {end_time:.0} {phoneme}"));
        last_time = end_time;
    }
    lines.push(format!("{last_time:.0} {duration_time:.0} sil"));

    lines.join("\n")
}

/// `.lab` content for a single-phoneme stationary unit.
pub fn generate_sta_lab(
    phoneme: &str,
    sample_rate: u32,
    offset_bytes: u64,
    cutoff_bytes: u64,
    total_bytes: u64,
) -> String {
    let offset_time = nsample2sec(offset_bytes, sample_rate) * 1e7;
    let cutoff_time = nsample2sec(cutoff_bytes, sample_rate) * 1e7;
    let duration_time = nsample2sec(total_bytes, sample_rate) * 1e7;

    format!(
        "0 {offset_time:.0} sil\n{offset_time:.0} {cutoff_time:.0} {phoneme}\n{cutoff_time:.0} {duration_time:.0} sil"
    )
}

/// `.trans` + `.seg` pair for an articulation unit, expanding a VCV
/// triphoneme's center phoneme the same way `generate_art_lab` does.
pub fn generate_art_seg_files(
    phonemes: &[String],
    frame_align: &[FrameWindow],
    sample_rate: u32,
    offset_bytes: u64,
    total_bytes: u64,
) -> (String, String) {
    let (trans, seg, _) = generate_art_seg_files_with_as0(phonemes, frame_align, sample_rate, offset_bytes, total_bytes, &[]);
    (trans, seg)
}

/// As [`generate_art_seg_files`], plus the `.as0` articulation segmentation
/// block (`extract_wav.py`'s `generate_art_seg_files` returns all three
/// together; split here only because `.trans`/`.seg` share no state with
/// the unvoiced-consonant list the `.as0` block needs).
pub fn generate_art_seg_files_with_as0(
    phonemes: &[String],
    frame_align: &[FrameWindow],
    sample_rate: u32,
    offset_bytes: u64,
    total_bytes: u64,
    unvoiced_consonants: &[String],
) -> (String, String, String) {
    let offset_time = nsample2sec(offset_bytes, sample_rate);
    let duration_time = nsample2sec(total_bytes, sample_rate);

    let (phonemes, boundary_chunks): (Vec<String>, usize) = if phonemes.len() == 3 {
        let center = strip_leading_caret(&phonemes[1]).to_string();
        (vec![phonemes[0].clone(), center, phonemes[2].clone()], 4)
    } else {
        (phonemes.to_vec(), 2)
    };

    let mut boundaries = Vec::with_capacity(boundary_chunks + 1);
    for i in 0..boundary_chunks {
        let frame = frame_align[i];
        let start_time = offset_time + frm2sec(frame.start, sample_rate);
        let end_time = offset_time + frm2sec(frame.end, sample_rate);
        if i == 0 {
            boundaries.push(start_time);
        }
        boundaries.push(end_time);
    }

    let seg_list: Vec<TimedPhoneme> = if phonemes.len() == 3 {
        vec![
            TimedPhoneme { phoneme: &phonemes[0], start: boundaries[0], end: boundaries[1] },
            TimedPhoneme { phoneme: &phonemes[1], start: boundaries[1], end: boundaries[3] },
            TimedPhoneme { phoneme: &phonemes[2], start: boundaries[3], end: boundaries[4] },
        ]
    } else {
        vec![
            TimedPhoneme { phoneme: &phonemes[0], start: boundaries[0], end: boundaries[1] },
            TimedPhoneme { phoneme: &phonemes[1], start: boundaries[1], end: boundaries[2] },
        ]
    };

    let trans = generate_transcription(&seg_list);
    let seg = generate_seg(&seg_list, duration_time, false);
    let as0 = generate_articulation_seg(&phonemes, &boundaries, total_bytes, unvoiced_consonants);
    (trans, seg, as0)
}

/// `.trans` + `.seg` pair for a stationary unit.
pub fn generate_sta_seg_files(
    phoneme: &str,
    sample_rate: u32,
    offset_bytes: u64,
    cutoff_bytes: u64,
    total_bytes: u64,
) -> (String, String) {
    let offset_time = nsample2sec(offset_bytes, sample_rate);
    let cutoff_time = nsample2sec(cutoff_bytes, sample_rate);
    let duration_time = nsample2sec(total_bytes, sample_rate);

    let seg_list = [TimedPhoneme { phoneme, start: offset_time, end: cutoff_time }];
    let trans = generate_transcription(&seg_list);
    let seg = generate_seg(&seg_list, duration_time, true);
    (trans, seg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nsample2sec_divides_by_rate_and_two() {
        assert_eq!(nsample2sec(88200, 44100), 1.0);
    }

    #[test]
    fn transcription_joins_and_brackets_phonemes() {
        let phonemes = [
            TimedPhoneme { phoneme: "a", start: 0.0, end: 1.0 },
            TimedPhoneme { phoneme: "i", start: 1.0, end: 2.0 },
        ];
        assert_eq!(generate_transcription(&phonemes), "a i\n[a i]");
    }

    #[test]
    fn seg_brackets_with_sil_and_reports_phoneme_count() {
        let phonemes = [TimedPhoneme { phoneme: "a", start: 0.1, end: 0.5 }];
        let seg = generate_seg(&phonemes, 1.0, false);
        assert!(seg.starts_with("nPhonemes 3\n"));
        assert!(seg.contains("Sil\t\t0.000000\t\t0.100000"));
        assert!(seg.contains("a\t\t0.100000\t\t0.500000"));
        assert!(seg.ends_with("Sil\t\t0.500000\t\t1.000000\n"));
    }

    #[test]
    fn sta_lab_has_three_fixed_lines() {
        let lab = generate_sta_lab("a", 44100, 0, 1000, 2000);
        assert_eq!(lab.lines().count(), 3);
        assert!(lab.lines().next().unwrap().ends_with("sil"));
    }

    #[test]
    fn articulation_seg_marks_special_tokens_unvoiced() {
        let phonemes = vec!["Sil".to_string(), "k".to_string()];
        let unvoiced = vec!["k".to_string()];
        let block = generate_articulation_seg(&phonemes, &[0.0, 0.1, 0.2], 4410, &unvoiced);
        assert!(block.contains("voiced: [false, false];"));
    }

    #[test]
    fn art_lab_expands_vcv_center_phoneme() {
        let phonemes = vec!["a".to_string(), "^k".to_string(), "i".to_string()];
        let frames = [
            FrameWindow { start: 0, end: 10 },
            FrameWindow { start: 10, end: 20 },
            FrameWindow { start: 20, end: 30 },
            FrameWindow { start: 30, end: 40 },
        ];
        let lab = generate_art_lab(&phonemes, &frames, 44100, 0, 100_000);
        assert_eq!(lab.lines().count(), 6);
        assert!(lab.lines().nth(2).unwrap().ends_with(" k"));
    }
}

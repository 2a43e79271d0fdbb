/// Font metrics for the two standard PDF fonts used by the report
///
/// Advance widths (1/1000 em) for printable ASCII, taken from the
/// Adobe Core 14 AFM files. Latin-1 letters outside ASCII use the
/// font's typical lowercase width.

/// Helvetica, characters 0x20..=0x7E
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

/// Helvetica-Bold, characters 0x20..=0x7E
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 0..?
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // P.._
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // `..o
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // p..~
];

/// Points per millimetre
pub const PT_PER_MM: f32 = 72.0 / 25.4;

/// The report's two fonts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    /// Name of the font in the page resources
    pub fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    /// PostScript name of the standard font
    pub fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
        }
    }

    fn char_width(self, c: char) -> u16 {
        let (table, fallback) = match self {
            Font::Regular => (&HELVETICA, 556),
            Font::Bold => (&HELVETICA_BOLD, 611),
        };
        match c as u32 {
            code @ 0x20..=0x7E => table[(code - 0x20) as usize],
            _ => fallback,
        }
    }

    /// Width of `text` in millimetres at `size` points
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| self.char_width(c) as u32).sum();
        units as f32 / 1000.0 * size / PT_PER_MM
    }

    /// Greedy word wrap to `max_width` millimetres.
    ///
    /// Explicit newlines start a new line. Words wider than a whole line
    /// are split between characters.
    pub fn wrap(self, text: &str, size: f32, max_width: f32) -> Vec<String> {
        let mut lines = Vec::new();

        for paragraph in text.split('\n') {
            let mut current = String::new();
            for word in paragraph.split_whitespace() {
                let candidate = if current.is_empty() {
                    word.to_string()
                } else {
                    format!("{current} {word}")
                };
                if self.text_width(&candidate, size) <= max_width {
                    current = candidate;
                    continue;
                }

                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                // The word alone may still be too wide
                for c in word.chars() {
                    current.push(c);
                    if self.text_width(&current, size) > max_width && current.chars().count() > 1 {
                        current.pop();
                        lines.push(std::mem::take(&mut current));
                        current.push(c);
                    }
                }
            }
            lines.push(current);
        }

        lines
    }
}

/// Encode text for a WinAnsi standard font.
/// Latin-1 maps directly; anything else becomes '?'.
pub fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            0x20AC => 0x80,
            0x09 => b' ',
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_of_known_string() {
        // H = 722, i = 222
        let w = Font::Regular.text_width("Hi", 10.0);
        let expected = 944.0 / 1000.0 * 10.0 / PT_PER_MM;
        assert!((w - expected).abs() < 1e-4);
        assert!(Font::Bold.text_width("Hi", 10.0) > w);
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "The north face of the roof shows visible cracking along the ridge and near the chimney flashing";
        let lines = Font::Regular.wrap(text, 12.0, 60.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(Font::Regular.text_width(line, 12.0) <= 60.0, "too wide: {line}");
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_splits_long_words_and_keeps_newlines() {
        let long = "x".repeat(200);
        let lines = Font::Regular.wrap(&format!("a\n{long}"), 12.0, 50.0);
        assert_eq!(lines[0], "a");
        assert!(lines.len() > 2);
        assert_eq!(lines[1..].concat(), long);
    }

    #[test]
    fn test_wrap_empty_text_is_one_blank_line() {
        assert_eq!(Font::Regular.wrap("", 12.0, 50.0), vec![String::new()]);
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(win_ansi("Descripción"), b"Descripci\xF3n".to_vec());
        assert_eq!(win_ansi("5€"), vec![b'5', 0x80]);
        assert_eq!(win_ansi("日"), b"?".to_vec());
    }
}

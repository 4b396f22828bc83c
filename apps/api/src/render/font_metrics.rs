//! Static width table for the PDF base font (Helvetica) and greedy word-wrap.
//!
//! Widths are in em units (AFM widths / 1000). Bold text is measured with the
//! regular table scaled by `BOLD_WIDTH_FACTOR`; the wrap margin absorbs the
//! difference.
//! The table covers ASCII 0x20..=0x7E (95 printable characters).
//! Index = (char as usize) - 32.

/// Approximate Helvetica-Bold / Helvetica width ratio.
pub const BOLD_WIDTH_FACTOR: f32 = 1.06;

pub struct FontMetricTable {
    widths: [f32; 95],
    /// Fallback width for non-ASCII characters (codepoints > 0x7E).
    pub average_char_width: f32,
    pub space_width: f32,
}

impl FontMetricTable {
    /// Measures the rendered width of a string in em units.
    pub fn measure_str(&self, s: &str) -> f32 {
        s.chars()
            .map(|c| {
                let code = c as usize;
                if (32..=126).contains(&code) {
                    self.widths[code - 32]
                } else {
                    self.average_char_width
                }
            })
            .sum()
    }

    /// Width in points at `font_size`, optionally bold.
    pub fn width_pt(&self, s: &str, font_size: f32, bold: bool) -> f32 {
        let factor = if bold { BOLD_WIDTH_FACTOR } else { 1.0 };
        self.measure_str(s) * font_size * factor
    }

    /// Greedy word-wrap into lines no wider than `max_width_pt`.
    ///
    /// A single word wider than the line gets a line of its own.
    pub fn wrap(&self, text: &str, font_size: f32, bold: bool, max_width_pt: f32) -> Vec<String> {
        let factor = if bold { BOLD_WIDTH_FACTOR } else { 1.0 };
        let mut lines = Vec::new();
        let mut current = String::new();

        for word in text.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate_width = self.width_pt(&current, font_size, bold)
                + self.space_width * font_size * factor
                + self.width_pt(word, font_size, bold);
            if candidate_width > max_width_pt {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            } else {
                current.push(' ');
                current.push_str(word);
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }
}

/// Helvetica (PDF standard 14 font).
pub static HELVETICA: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp    !      "      #      $      %      &      '      (      )      *      +      ,      -      .      /
        0.278, 0.278, 0.355, 0.556, 0.556, 0.889, 0.667, 0.191, 0.333, 0.333, 0.389, 0.584, 0.278, 0.333, 0.278, 0.278,
        // 0      1      2      3      4      5      6      7      8      9
        0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556,
        // :      ;      <      =      >      ?      @
        0.278, 0.278, 0.584, 0.584, 0.584, 0.556, 1.015,
        // A      B      C      D      E      F      G      H      I      J      K      L      M
        0.667, 0.667, 0.722, 0.722, 0.667, 0.611, 0.778, 0.722, 0.278, 0.500, 0.667, 0.556, 0.833,
        // N      O      P      Q      R      S      T      U      V      W      X      Y      Z
        0.722, 0.778, 0.667, 0.778, 0.722, 0.667, 0.611, 0.722, 0.667, 0.944, 0.667, 0.667, 0.611,
        // [      \      ]      ^      _      `
        0.278, 0.278, 0.278, 0.469, 0.556, 0.333,
        // a      b      c      d      e      f      g      h      i      j      k      l      m
        0.556, 0.556, 0.500, 0.556, 0.556, 0.278, 0.556, 0.556, 0.222, 0.222, 0.500, 0.222, 0.833,
        // n      o      p      q      r      s      t      u      v      w      x      y      z
        0.556, 0.556, 0.556, 0.556, 0.333, 0.500, 0.278, 0.556, 0.500, 0.722, 0.500, 0.500, 0.500,
        // {      |      }      ~
        0.334, 0.260, 0.334, 0.584,
    ],
    average_char_width: 0.556,
    space_width: 0.278,
};

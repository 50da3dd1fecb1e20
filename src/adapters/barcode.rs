//! Code 128 (code set B) encoder emitting bare SVG bars, no human-readable text.

use crate::config::toml_config::BarcodeConfig;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt::Write as _;
use thiserror::Error;

/// Bar/space widths for symbol values 0..=105, then the stop pattern.
const PATTERNS: [&str; 107] = [
    "212222", "222122", "222221", "121223", "121322", "131222", "122213", "122312", "132212",
    "221213", "221312", "231212", "112232", "122132", "122231", "113222", "123122", "123221",
    "223211", "221132", "221231", "213212", "223112", "312131", "311222", "321122", "321221",
    "312212", "322112", "322211", "212123", "212321", "232121", "111323", "131123", "131321",
    "112313", "132113", "132311", "211313", "231113", "231311", "112133", "112331", "132131",
    "113123", "113321", "133121", "313121", "211331", "231131", "213113", "213311", "213131",
    "311123", "311321", "331121", "312113", "312311", "332111", "314111", "221411", "431111",
    "111224", "111422", "121124", "121421", "141122", "141221", "112214", "112412", "122114",
    "122411", "142112", "142211", "241211", "221114", "413111", "241112", "134111", "111242",
    "121142", "121241", "114212", "124112", "124211", "411212", "421112", "421211", "212141",
    "214121", "412121", "111143", "111341", "131141", "114113", "114311", "411113", "411311",
    "113141", "114131", "311141", "411131", "211412", "211214", "211232", "2331112",
];

const START_B: u8 = 104;
const STOP: u8 = 106;
const CHECK_MODULUS: u32 = 103;
const STOP_MODULES: usize = 13;
const SYMBOL_MODULES: usize = 11;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BarcodeError {
    #[error("nothing to encode")]
    Empty,
    #[error("character {0:?} is not in Code 128 set B")]
    Unsupported(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code128 {
    /// Start, data, check and stop symbol values.
    values: Vec<u8>,
}

impl Code128 {
    pub fn encode(data: &str) -> Result<Self, BarcodeError> {
        if data.is_empty() {
            return Err(BarcodeError::Empty);
        }

        let mut values = Vec::with_capacity(data.len() + 3);
        values.push(START_B);
        for ch in data.chars() {
            match ch {
                ' '..='\u{7f}' => values.push(ch as u8 - b' '),
                other => return Err(BarcodeError::Unsupported(other)),
            }
        }

        let weighted: u32 = values
            .iter()
            .skip(1)
            .enumerate()
            .map(|(i, &v)| (i as u32 + 1) * u32::from(v))
            .sum();
        let check = (u32::from(START_B) + weighted) % CHECK_MODULUS;
        values.push(check as u8);
        values.push(STOP);

        Ok(Self { values })
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    pub fn check_value(&self) -> u8 {
        self.values[self.values.len() - 2]
    }

    /// Symbol width in modules, quiet zones excluded.
    pub fn modules(&self) -> usize {
        (self.values.len() - 1) * SYMBOL_MODULES + STOP_MODULES
    }

    /// Alternating bar/space widths, starting with a bar.
    pub fn widths(&self) -> impl Iterator<Item = u8> + '_ {
        self.values
            .iter()
            .flat_map(|&v| PATTERNS[usize::from(v)].bytes().map(|b| b - b'0'))
    }

    pub fn to_svg(&self, config: &BarcodeConfig) -> String {
        let quiet = f64::from(config.quiet_zone);
        let total_modules = self.modules() as f64 + 2.0 * quiet;
        let width = total_modules * config.module_width;

        let mut svg = String::new();
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" shape-rendering="crispEdges">"#,
            w = width,
            h = config.height
        );
        let _ = write!(svg, r##"<rect width="{}" height="{}" fill="#fff"/>"##, width, config.height);

        let mut cursor = quiet;
        for (i, w) in self.widths().enumerate() {
            let w = f64::from(w);
            if i % 2 == 0 {
                let _ = write!(
                    svg,
                    r##"<rect x="{}" y="0" width="{}" height="{}" fill="#000"/>"##,
                    cursor * config.module_width,
                    w * config.module_width,
                    config.height
                );
            }
            cursor += w;
        }
        svg.push_str("</svg>");
        svg
    }

    pub fn to_data_uri(&self, config: &BarcodeConfig) -> String {
        format!(
            "data:image/svg+xml;base64,{}",
            STANDARD.encode(self.to_svg(config))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_symbol_is_eleven_modules() {
        for (value, pattern) in PATTERNS.iter().enumerate().take(106) {
            let modules: u32 = pattern.bytes().map(|b| u32::from(b - b'0')).sum();
            assert_eq!(modules, 11, "symbol {}", value);
        }
        let stop: u32 = PATTERNS[106].bytes().map(|b| u32::from(b - b'0')).sum();
        assert_eq!(stop, 13);
    }

    #[test]
    fn test_encode_computes_check_symbol() {
        let code = Code128::encode("Wikipedia").unwrap();
        assert_eq!(code.values()[0], START_B);
        assert_eq!(code.check_value(), 88);
        assert_eq!(*code.values().last().unwrap(), STOP);

        let code = Code128::encode("001").unwrap();
        // 104 + 1*16 + 2*16 + 3*17 = 203 -> 100
        assert_eq!(code.values(), [104, 16, 16, 17, 100, 106]);
        assert_eq!(code.modules(), 5 * 11 + 13);
    }

    #[test]
    fn test_encode_rejects_unsupported_input() {
        assert_eq!(Code128::encode(""), Err(BarcodeError::Empty));
        assert_eq!(Code128::encode("Zoë"), Err(BarcodeError::Unsupported('ë')));
        assert_eq!(Code128::encode("a\tb"), Err(BarcodeError::Unsupported('\t')));
    }

    #[test]
    fn test_svg_has_one_rect_per_bar() {
        let code = Code128::encode("001").unwrap();
        let config = BarcodeConfig {
            module_width: 2.0,
            height: 40.0,
            quiet_zone: 10,
        };
        let svg = code.to_svg(&config);

        // Background plus three bars per symbol and four in the stop pattern.
        assert_eq!(svg.matches("<rect").count(), 1 + 5 * 3 + 4);
        assert!(svg.contains(r#"width="176" height="40""#));
        // Start B begins with a two-module bar right after the quiet zone.
        assert!(svg.contains(r##"<rect x="20" y="0" width="4" height="40" fill="#000"/>"##));

        assert!(code
            .to_data_uri(&config)
            .starts_with("data:image/svg+xml;base64,"));
    }
}

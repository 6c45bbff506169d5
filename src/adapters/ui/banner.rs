//! Startup banner: "CHANTIER" in figlet with a vertical gradient.

use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use figlet_rs::FIGfont;
use std::io::{Write, stdout};

/// Safety orange (#ff7a00).
const SAFETY_ORANGE: (u8, u8, u8) = (0xff, 0x7a, 0x00);
/// Concrete grey (#a8b0b8).
const CONCRETE_GREY: (u8, u8, u8) = (0xa8, 0xb0, 0xb8);

/// Linear interpolation between two RGB colors. `t` in [0.0, 1.0].
fn lerp_rgb(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let r = (f64::from(a.0) * (1.0 - t) + f64::from(b.0) * t).round() as u8;
    let g = (f64::from(a.1) * (1.0 - t) + f64::from(b.1) * t).round() as u8;
    let bl = (f64::from(a.2) * (1.0 - t) + f64::from(b.2) * t).round() as u8;
    (r, g, bl)
}

/// Figlet art for `text`, or the plain text when the font is unavailable.
fn art(text: &str) -> String {
    FIGfont::standard()
        .ok()
        .and_then(|font| font.convert(text).map(|f| f.to_string()))
        .unwrap_or_else(|| text.to_string())
}

/// Prints the welcome banner, then version and the current user.
pub fn print_welcome(user_id: &str) {
    let mut out = stdout();
    let art = art("CHANTIER");
    let lines: Vec<&str> = art.lines().collect();
    let total = lines.len().max(1);

    for (i, line) in lines.iter().enumerate() {
        let t = if total <= 1 {
            1.0
        } else {
            i as f64 / (total - 1) as f64
        };
        let (r, g, b) = lerp_rgb(SAFETY_ORANGE, CONCRETE_GREY, t);
        let _ = out.execute(SetForegroundColor(Color::Rgb { r, g, b }));
        let _ = out.execute(Print(line));
        let _ = out.execute(Print("\r\n"));
        let _ = out.execute(ResetColor);
    }

    let _ = out.execute(SetForegroundColor(Color::Rgb {
        r: CONCRETE_GREY.0,
        g: CONCRETE_GREY.1,
        b: CONCRETE_GREY.2,
    }));
    let _ = out.execute(Print(format!(
        "v{}  |  utilisateur : {}\r\n\r\n",
        env!("CARGO_PKG_VERSION"),
        user_id
    )));
    let _ = out.execute(ResetColor);
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_endpoints() {
        assert_eq!(lerp_rgb(SAFETY_ORANGE, CONCRETE_GREY, 0.0), SAFETY_ORANGE);
        assert_eq!(lerp_rgb(SAFETY_ORANGE, CONCRETE_GREY, 1.0), CONCRETE_GREY);
    }

    #[test]
    fn test_art_is_multiline() {
        assert!(art("CHANTIER").lines().count() > 1);
    }
}

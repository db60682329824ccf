//! Parsed G-code command model.
//!
//! A [`Command`] keeps the raw line text, the parsed parameter words, the
//! inline comment, and the line terminator, so that non-replaced lines can be
//! written back byte-identical. Parsing is whitespace- and comment-aware and
//! tolerant of mixed case.

use log::warn;

use crate::CoordF;

/// Line terminator style of a source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// Unix `\n`
    #[default]
    Lf,
    /// Windows `\r\n`
    CrLf,
    /// Classic Mac `\r`
    Cr,
    /// Final line without a terminator
    None,
}

impl LineEnding {
    /// The terminator bytes for this style.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
            LineEnding::Cr => "\r",
            LineEnding::None => "",
        }
    }
}

/// Command classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// G0 - Rapid move (travel)
    RapidMove,
    /// G1 - Linear move
    LinearMove,
    /// G2 - Clockwise arc
    ArcCW,
    /// G3 - Counter-clockwise arc
    ArcCCW,
    /// G20 - Inch units
    SetUnitsInches,
    /// G21 - Millimeter units
    SetUnitsMm,
    /// G90 - Absolute positioning
    AbsolutePositioning,
    /// G91 - Relative positioning
    RelativePositioning,
    /// G92 - Set position without motion
    SetPosition,
    /// G28 - Home axes
    Home,
    /// M82 - Absolute extrusion
    AbsoluteExtrusion,
    /// M83 - Relative extrusion
    RelativeExtrusion,
    /// T<n> - Tool selection
    ToolChange,
    /// Anything else: passed through untouched
    Other,
}

impl CommandKind {
    /// Whether this command moves the tool (G0/G1/G2/G3).
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            CommandKind::RapidMove
                | CommandKind::LinearMove
                | CommandKind::ArcCW
                | CommandKind::ArcCCW
        )
    }

    /// Whether this command is a candidate for arc fitting (G0/G1 only;
    /// existing G2/G3 arcs are tracked but never re-fitted).
    pub fn is_fittable(&self) -> bool {
        matches!(self, CommandKind::RapidMove | CommandKind::LinearMove)
    }
}

/// A single parameter word, e.g. `X12.345`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter letter, uppercased.
    pub letter: char,
    /// Parsed numeric value.
    pub value: CoordF,
    /// Original text of the numeric literal.
    pub raw: String,
    /// Number of decimal places observed in the literal.
    pub decimals: u8,
}

/// A parsed G-code line.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Raw line text without the terminator (includes any comment).
    pub raw: String,
    /// 1-based source line number.
    pub line_number: usize,
    /// Command classification.
    pub kind: CommandKind,
    /// Parameter words following the command word, in source order.
    pub params: Vec<Parameter>,
    /// Inline comment starting at `;`, if any.
    pub comment: Option<String>,
    /// Terminator style of the source line.
    pub ending: LineEnding,
    /// True when every token parsed cleanly. Motion commands with unknown
    /// tokens still update printer state from the recognized words but are
    /// never consumed into an arc.
    pub has_unknown_tokens: bool,
}

impl Command {
    /// Parse a source line (without terminator).
    pub fn parse(raw: &str, line_number: usize, ending: LineEnding) -> Command {
        let (code, comment) = match raw.find(';') {
            Some(idx) => (&raw[..idx], Some(raw[idx..].to_string())),
            None => (raw, None),
        };

        let mut kind = CommandKind::Other;
        let mut params = Vec::new();
        let mut has_unknown_tokens = false;
        let mut saw_command_word = false;

        for token in code.split_whitespace() {
            match parse_word(token) {
                Some(param) => {
                    if !saw_command_word {
                        saw_command_word = true;
                        kind = classify(param.letter, param.value);
                        // The tool index of a T word is a parameter in its
                        // own right; axis words of G/M commands follow.
                        if kind == CommandKind::ToolChange {
                            params.push(param);
                        }
                        continue;
                    }
                    params.push(param);
                }
                None => {
                    // Bare axis letters are legal flag words (e.g. `G28 X`).
                    let mut chars = token.chars();
                    if let (Some(letter), None) = (chars.next(), chars.next()) {
                        if letter.is_ascii_alphabetic() && saw_command_word {
                            params.push(Parameter {
                                letter: letter.to_ascii_uppercase(),
                                value: 0.0,
                                raw: String::new(),
                                decimals: 0,
                            });
                            continue;
                        }
                    }
                    warn!(
                        "line {}: unrecognized token '{}', passing line through",
                        line_number, token
                    );
                    has_unknown_tokens = true;
                }
            }
        }

        Command {
            raw: raw.to_string(),
            line_number,
            kind,
            params,
            comment,
            ending,
            has_unknown_tokens,
        }
    }

    /// Look up a parameter by letter (case-insensitive).
    pub fn param(&self, letter: char) -> Option<&Parameter> {
        let letter = letter.to_ascii_uppercase();
        self.params.iter().find(|p| p.letter == letter)
    }

    /// Look up a parameter value by letter.
    pub fn param_value(&self, letter: char) -> Option<CoordF> {
        self.param(letter).map(|p| p.value)
    }

    /// Whether the line holds only whitespace or a comment.
    pub fn is_empty(&self) -> bool {
        self.kind == CommandKind::Other && self.params.is_empty() && {
            let code = match self.raw.find(';') {
                Some(idx) => &self.raw[..idx],
                None => &self.raw,
            };
            code.trim().is_empty()
        }
    }
}

/// Parse a single `L<number>` word. Returns `None` for anything that is not
/// a letter followed by a valid decimal (optionally signed or scientific).
fn parse_word(token: &str) -> Option<Parameter> {
    let mut chars = token.chars();
    let letter = chars.next()?;
    if !letter.is_ascii_alphabetic() {
        return None;
    }
    let number = chars.as_str();
    let value: CoordF = number.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(Parameter {
        letter: letter.to_ascii_uppercase(),
        value,
        raw: number.to_string(),
        decimals: count_decimals(number),
    })
}

/// Count decimal places in a numeric literal (digits after `.`, before any
/// exponent).
fn count_decimals(literal: &str) -> u8 {
    let mantissa = literal
        .split(['e', 'E'])
        .next()
        .unwrap_or(literal);
    match mantissa.find('.') {
        Some(idx) => (mantissa.len() - idx - 1).min(u8::MAX as usize) as u8,
        None => 0,
    }
}

fn classify(letter: char, value: CoordF) -> CommandKind {
    // Command numbers are small integers; fractional or negative words
    // (e.g. G38.2) fall through to Other.
    if value.fract() != 0.0 || value < 0.0 {
        return CommandKind::Other;
    }
    let number = value as i64;
    match (letter, number) {
        ('G', 0) => CommandKind::RapidMove,
        ('G', 1) => CommandKind::LinearMove,
        ('G', 2) => CommandKind::ArcCW,
        ('G', 3) => CommandKind::ArcCCW,
        ('G', 20) => CommandKind::SetUnitsInches,
        ('G', 21) => CommandKind::SetUnitsMm,
        ('G', 28) => CommandKind::Home,
        ('G', 90) => CommandKind::AbsolutePositioning,
        ('G', 91) => CommandKind::RelativePositioning,
        ('G', 92) => CommandKind::SetPosition,
        ('M', 82) => CommandKind::AbsoluteExtrusion,
        ('M', 83) => CommandKind::RelativeExtrusion,
        ('T', _) => CommandKind::ToolChange,
        _ => CommandKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Command {
        Command::parse(raw, 1, LineEnding::Lf)
    }

    #[test]
    fn test_parse_linear_move() {
        let cmd = parse("G1 X10.5 Y-3.25 E0.12345 F1800");
        assert_eq!(cmd.kind, CommandKind::LinearMove);
        assert_eq!(cmd.param_value('X'), Some(10.5));
        assert_eq!(cmd.param_value('Y'), Some(-3.25));
        assert_eq!(cmd.param_value('E'), Some(0.12345));
        assert_eq!(cmd.param_value('F'), Some(1800.0));
        assert!(!cmd.has_unknown_tokens);
    }

    #[test]
    fn test_parse_mixed_case() {
        let cmd = parse("g1 x1.0 y2.0");
        assert_eq!(cmd.kind, CommandKind::LinearMove);
        assert_eq!(cmd.param_value('X'), Some(1.0));
        assert_eq!(cmd.param_value('y'), Some(2.0));
    }

    #[test]
    fn test_parse_comment() {
        let cmd = parse("G1 X1 Y2 ; outer wall");
        assert_eq!(cmd.kind, CommandKind::LinearMove);
        assert_eq!(cmd.comment.as_deref(), Some("; outer wall"));
        assert_eq!(cmd.param_value('X'), Some(1.0));
    }

    #[test]
    fn test_parse_comment_only_line() {
        let cmd = parse("; just a comment");
        assert_eq!(cmd.kind, CommandKind::Other);
        assert!(cmd.is_empty());
    }

    #[test]
    fn test_parse_tool_change() {
        let cmd = parse("T1");
        assert_eq!(cmd.kind, CommandKind::ToolChange);
        assert_eq!(cmd.param_value('T'), Some(1.0));
    }

    #[test]
    fn test_parse_decimals_recorded() {
        let cmd = parse("G1 X10.123456 E0.41");
        assert_eq!(cmd.param('X').unwrap().decimals, 6);
        assert_eq!(cmd.param('E').unwrap().decimals, 2);
        assert_eq!(cmd.param('X').unwrap().raw, "10.123456");
    }

    #[test]
    fn test_parse_scientific_literal() {
        let cmd = parse("G1 X1e-3 Y2.5E2");
        assert_eq!(cmd.param_value('X'), Some(0.001));
        assert_eq!(cmd.param_value('Y'), Some(250.0));
        assert_eq!(cmd.param('Y').unwrap().decimals, 1);
    }

    #[test]
    fn test_parse_home_with_flag_words() {
        let cmd = parse("G28 X Y");
        assert_eq!(cmd.kind, CommandKind::Home);
        assert!(!cmd.has_unknown_tokens);
        assert!(cmd.param('X').is_some());
        assert!(cmd.param('Y').is_some());
        assert!(cmd.param('Z').is_none());
        assert!(cmd.param('X').unwrap().raw.is_empty());
    }

    #[test]
    fn test_parse_unknown_token() {
        let cmd = parse("G1 X1 Y2 *47");
        assert_eq!(cmd.kind, CommandKind::LinearMove);
        assert!(cmd.has_unknown_tokens);
        // Recognized words still parse
        assert_eq!(cmd.param_value('X'), Some(1.0));
    }

    #[test]
    fn test_parse_malformed_number() {
        let cmd = parse("G1 X1.2.3 Y2");
        assert!(cmd.has_unknown_tokens);
        assert_eq!(cmd.param_value('X'), None);
        assert_eq!(cmd.param_value('Y'), Some(2.0));
    }

    #[test]
    fn test_parse_fractional_gcode_is_other() {
        let cmd = parse("G38.2 Z-10");
        assert_eq!(cmd.kind, CommandKind::Other);
    }

    #[test]
    fn test_motion_classification() {
        assert!(CommandKind::RapidMove.is_motion());
        assert!(CommandKind::ArcCW.is_motion());
        assert!(!CommandKind::ArcCW.is_fittable());
        assert!(CommandKind::LinearMove.is_fittable());
        assert!(!CommandKind::SetPosition.is_motion());
    }
}

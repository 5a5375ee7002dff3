//! SVG waypoint import
//!
//! Reads the polyline of a single labelled `<path>` element. Only straight
//! segments are understood: `M/m`, `L/l`, `H/h`, `V/v` and `Z/z`.

use sandtable_core::{PlannerError, Waypoint};
use std::path::Path;

/// Label Inkscape gives the drawing path
pub const DEFAULT_PATH_LABEL: &str = "img_path";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Command(char),
    Number(f64),
}

/// SVG importer
#[derive(Debug, Clone)]
pub struct SvgImporter {
    label: String,
}

impl Default for SvgImporter {
    fn default() -> Self {
        Self::new(DEFAULT_PATH_LABEL)
    }
}

impl SvgImporter {
    /// Create an importer looking for the path with the given `inkscape:label`
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// Import waypoints from an SVG file
    pub fn import_file(&self, path: impl AsRef<Path>) -> Result<Vec<Waypoint>, PlannerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| PlannerError::Import {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        self.import_string(&content)
    }

    /// Import waypoints from SVG content
    pub fn import_string(&self, svg_content: &str) -> Result<Vec<Waypoint>, PlannerError> {
        if !svg_content.contains("<svg") {
            return Err(import_error("missing <svg> element"));
        }

        let mut found_any = false;
        let mut search_pos = 0;
        while let Some(tag_start) = svg_content[search_pos..].find("<path") {
            let abs_tag_start = search_pos + tag_start;
            let Some(tag_end) = svg_content[abs_tag_start..].find('>') else {
                break;
            };
            let tag = &svg_content[abs_tag_start..abs_tag_start + tag_end];
            search_pos = abs_tag_start + tag_end;
            found_any = true;

            if extract_attr_str(tag, "inkscape:label") != Some(self.label.as_str()) {
                continue;
            }

            let data = extract_attr_str(tag, "d")
                .ok_or_else(|| import_error("labelled path has no 'd' attribute"))?;
            return parse_path_data(data);
        }

        if found_any {
            Err(import_error(format!("no path labelled '{}'", self.label)))
        } else {
            Err(import_error("no <path> elements found"))
        }
    }
}

fn import_error(reason: impl Into<String>) -> PlannerError {
    PlannerError::Import {
        reason: reason.into(),
    }
}

/// Value of `attr="..."` inside a tag, matching whole attribute names only
fn extract_attr_str<'a>(tag: &'a str, attr: &str) -> Option<&'a str> {
    let pattern = format!("{}=\"", attr);
    let mut from = 0;
    while let Some(pos) = tag[from..].find(&pattern) {
        let start = from + pos;
        let preceded_by_space = tag[..start]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace);
        let value_start = start + pattern.len();
        if preceded_by_space {
            let value_end = tag[value_start..].find('"')?;
            return Some(&tag[value_start..value_start + value_end]);
        }
        from = value_start;
    }
    None
}

fn tokenize(data: &str) -> Result<Vec<Token>, PlannerError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = data.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_alphabetic() {
            tokens.push(Token::Command(c));
            i += 1;
        } else if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' {
            let start = i;
            i += 1;
            let mut seen_dot = c == '.';
            while i < chars.len() {
                let d = chars[i];
                if d.is_ascii_digit() {
                    i += 1;
                } else if d == '.' && !seen_dot {
                    seen_dot = true;
                    i += 1;
                } else {
                    break;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| import_error(format!("invalid number '{}'", text)))?;
            tokens.push(Token::Number(value));
        } else {
            // separators
            i += 1;
        }
    }

    Ok(tokens)
}

/// Parse SVG path data into absolute waypoints.
///
/// Parsing stops with a warning at the first unsupported command; the
/// points gathered up to there are returned.
pub fn parse_path_data(data: &str) -> Result<Vec<Waypoint>, PlannerError> {
    let tokens = tokenize(data)?;
    let mut idx = 0;
    let mut positions: Vec<Waypoint> = Vec::new();
    let mut cur = Waypoint::default();
    let mut cmd: Option<char> = None;

    let next_number = |idx: &mut usize| -> Result<f64, PlannerError> {
        match tokens.get(*idx) {
            Some(Token::Number(v)) => {
                *idx += 1;
                Ok(*v)
            }
            _ => Err(import_error("incomplete coordinates in path data")),
        }
    };

    while idx < tokens.len() {
        if let Token::Command(c) = tokens[idx] {
            cmd = Some(c);
            idx += 1;
        }

        match cmd {
            Some('m') => {
                cur.x += next_number(&mut idx)?;
                cur.y += next_number(&mut idx)?;
                cmd = Some('l');
            }
            Some('M') => {
                cur.x = next_number(&mut idx)?;
                cur.y = next_number(&mut idx)?;
                cmd = Some('L');
            }
            Some('l') => {
                cur.x += next_number(&mut idx)?;
                cur.y += next_number(&mut idx)?;
            }
            Some('L') => {
                cur.x = next_number(&mut idx)?;
                cur.y = next_number(&mut idx)?;
            }
            Some('h') => cur.x += next_number(&mut idx)?,
            Some('H') => cur.x = next_number(&mut idx)?,
            Some('v') => cur.y += next_number(&mut idx)?,
            Some('V') => cur.y = next_number(&mut idx)?,
            Some('z') | Some('Z') => {
                let Some(first) = positions.first().copied() else {
                    return Err(import_error("close path before any point"));
                };
                if matches!(tokens.get(idx), Some(Token::Number(_))) {
                    return Err(import_error("unexpected number after close path"));
                }
                cur = first;
            }
            Some(other) => {
                tracing::warn!("Unsupported path command '{}', stopping import", other);
                break;
            }
            None => return Err(import_error("path data must start with a command")),
        }

        positions.push(cur);
    }

    Ok(positions)
}

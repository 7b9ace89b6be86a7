//! Area-group constraint language.
//!
//! Statements end with `;` and may span lines; `#` starts a comment that runs
//! to the end of the line. Supported statements:
//!
//! - `DIMENSION FPGA <x>,<y>;`: chip extent, exactly once
//! - `AREAGROUP <name> = "<path>" | None;`: declare a group
//! - `<child> in <parent>;`: nest a group
//! - `LOCATION <name> <x>,<y>;`: fix the center
//! - `DIMENSION <name> <x>,<y>;`: fix the size
//! - `RESOURCES <name> <area>;`: required area
//! - `LOWERLEFT <name> <x>,<y>;` / `UPPERRIGHT <name> <x>,<y>;`: fix the
//!   rectangle by its corners (both required)
//! - `ATTRIBUTE <name> <KEY> = <VALUE>;`
//!
//! Groups must be declared before any other statement names them.

use crate::error::PlaceError;
use crate::group::{AreaGroup, Chip, Dimension};
use std::collections::BTreeMap;

/// Parsed constraint file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintSet {
    /// Chip extent, if declared.
    pub chip: Option<Chip>,
    /// Declared groups by name.
    pub groups: BTreeMap<String, AreaGroup>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Comma,
    Equals,
}

#[derive(Default)]
struct Corners {
    lower_left: Option<(f64, f64, usize)>,
    upper_right: Option<(f64, f64, usize)>,
}

/// Parses a constraint file.
pub fn parse_constraints(source: &str) -> Result<ConstraintSet, PlaceError> {
    let mut set = ConstraintSet::default();
    let mut corners: BTreeMap<String, Corners> = BTreeMap::new();

    for (line, statement) in split_statements(source) {
        let tokens = tokenize(&statement, line)?;
        if tokens.is_empty() {
            continue;
        }
        apply_statement(&mut set, &mut corners, &tokens, line)?;
    }

    for (name, c) in corners {
        match (c.lower_left, c.upper_right) {
            (Some((x0, y0, _)), Some((x1, y1, line))) => {
                if x1 <= x0 || y1 <= y0 {
                    return Err(PlaceError::Parse {
                        line,
                        message: format!("UPPERRIGHT of `{name}` is not above and right of LOWERLEFT"),
                    });
                }
                if let Some(group) = set.groups.get_mut(&name) {
                    group.place((x0 + x1) / 2.0, (y0 + y1) / 2.0, x1 - x0, y1 - y0);
                }
            }
            (Some((_, _, line)), None) | (None, Some((_, _, line))) => {
                return Err(PlaceError::Parse {
                    line,
                    message: format!("`{name}` needs both LOWERLEFT and UPPERRIGHT"),
                });
            }
            (None, None) => {}
        }
    }

    validate_hierarchy(&set)?;
    tracing::debug!(groups = set.groups.len(), "parsed area-group constraints");
    Ok(set)
}

/// Rejects parent/child structures other than a single nesting level.
pub fn validate_hierarchy(set: &ConstraintSet) -> Result<(), PlaceError> {
    for group in set.groups.values() {
        if let Some(parent) = &group.parent {
            if !group.children.is_empty() {
                return Err(PlaceError::Config(format!(
                    "group `{}` has children and is itself inside `{parent}`",
                    group.name
                )));
            }
        }
    }
    Ok(())
}

fn apply_statement(
    set: &mut ConstraintSet,
    corners: &mut BTreeMap<String, Corners>,
    tokens: &[Token],
    line: usize,
) -> Result<(), PlaceError> {
    let err = |message: String| PlaceError::Parse { line, message };
    let Token::Word(head) = &tokens[0] else {
        return Err(err("statement must start with a keyword or group name".into()));
    };

    match (head.as_str(), tokens.get(1)) {
        ("DIMENSION", Some(Token::Word(target))) if target == "FPGA" => {
            let (width, height) = pair(&tokens[2..], line)?;
            if set.chip.is_some() {
                return Err(PlaceError::Config(format!(
                    "chip dimension declared twice (line {line})"
                )));
            }
            if width <= 0.0 || height <= 0.0 {
                return Err(err("chip dimension must be positive".into()));
            }
            set.chip = Some(Chip { width, height });
        }
        ("AREAGROUP", Some(Token::Word(name))) => {
            if tokens.get(2) != Some(&Token::Equals) || tokens.len() != 4 {
                return Err(err("expected `AREAGROUP <name> = \"<path>\" | None`".into()));
            }
            let source_path = match &tokens[3] {
                Token::Str(path) => Some(path.clone()),
                Token::Word(w) if w == "None" => None,
                _ => return Err(err("group path must be a quoted string or None".into())),
            };
            if set.groups.contains_key(name) {
                return Err(err(format!("group `{name}` declared twice")));
            }
            let mut group = AreaGroup::new(name.clone());
            group.source_path = source_path;
            set.groups.insert(name.clone(), group);
        }
        (child, Some(Token::Word(kw))) if kw == "in" => {
            let [_, _, Token::Word(parent)] = tokens else {
                return Err(err("expected `<child> in <parent>`".into()));
            };
            declared(set, child, line)?;
            declared(set, parent, line)?;
            if child == parent {
                return Err(PlaceError::Config(format!("group `{child}` cannot contain itself")));
            }
            if let Some(existing) = &set.groups[child].parent {
                return Err(PlaceError::Config(format!(
                    "group `{child}` is already inside `{existing}`"
                )));
            }
            if let Some(g) = set.groups.get_mut(child) {
                g.parent = Some(parent.clone());
            }
            if let Some(g) = set.groups.get_mut(parent) {
                g.children.push(child.to_string());
                g.children.sort();
            }
        }
        ("LOCATION", Some(Token::Word(name))) => {
            let (x, y) = pair(&tokens[2..], line)?;
            let g = declared(set, name, line)?;
            g.x_loc = Some(x);
            g.y_loc = Some(y);
        }
        ("DIMENSION", Some(Token::Word(name))) => {
            let (width, height) = pair(&tokens[2..], line)?;
            let g = declared(set, name, line)?;
            g.dimension = Dimension::Fixed { width, height };
        }
        ("RESOURCES", Some(Token::Word(name))) => {
            let [_, _, Token::Word(area)] = tokens else {
                return Err(err("expected `RESOURCES <name> <area>`".into()));
            };
            let area = number(area, line)?;
            declared(set, name, line)?.area = area;
        }
        ("LOWERLEFT", Some(Token::Word(name))) | ("UPPERRIGHT", Some(Token::Word(name))) => {
            let (x, y) = pair(&tokens[2..], line)?;
            declared(set, name, line)?;
            let entry = corners.entry(name.clone()).or_default();
            if head == "LOWERLEFT" {
                entry.lower_left = Some((x, y, line));
            } else {
                entry.upper_right = Some((x, y, line));
            }
        }
        ("ATTRIBUTE", Some(Token::Word(name))) => {
            let [_, _, Token::Word(key), Token::Equals, value] = tokens else {
                return Err(err("expected `ATTRIBUTE <name> <KEY> = <VALUE>`".into()));
            };
            let value = match value {
                Token::Word(v) | Token::Str(v) => v.clone(),
                _ => return Err(err("attribute value must be a word or string".into())),
            };
            declared(set, name, line)?
                .attributes
                .insert(key.clone(), value);
        }
        _ => return Err(err(format!("unrecognized statement starting with `{head}`"))),
    }
    Ok(())
}

fn declared<'s>(
    set: &'s mut ConstraintSet,
    name: &str,
    line: usize,
) -> Result<&'s mut AreaGroup, PlaceError> {
    set.groups.get_mut(name).ok_or_else(|| PlaceError::Parse {
        line,
        message: format!("group `{name}` is not declared"),
    })
}

fn number(word: &str, line: usize) -> Result<f64, PlaceError> {
    word.parse().map_err(|_| PlaceError::Parse {
        line,
        message: format!("`{word}` is not a number"),
    })
}

fn pair(tokens: &[Token], line: usize) -> Result<(f64, f64), PlaceError> {
    match tokens {
        [Token::Word(x), Token::Comma, Token::Word(y)] => Ok((number(x, line)?, number(y, line)?)),
        _ => Err(PlaceError::Parse {
            line,
            message: "expected `<x>,<y>`".into(),
        }),
    }
}

/// Splits source text into `;`-terminated statements with comments removed.
/// Each statement carries the line its first non-blank character is on.
fn split_statements(source: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut start_line = None;
    let mut in_string = false;

    for (i, raw) in source.lines().enumerate() {
        let line_no = i + 1;
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            match c {
                '"' => {
                    in_string = !in_string;
                    current.push(c);
                }
                '#' if !in_string => break,
                ';' if !in_string => {
                    if let Some(line) = start_line.take() {
                        out.push((line, std::mem::take(&mut current)));
                    }
                    current.clear();
                }
                _ => {
                    if start_line.is_none() && !c.is_whitespace() {
                        start_line = Some(line_no);
                    }
                    current.push(c);
                }
            }
        }
        current.push(' ');
    }
    if let Some(line) = start_line {
        out.push((line, current));
    }
    out
}

fn tokenize(statement: &str, line: usize) -> Result<Vec<Token>, PlaceError> {
    let mut tokens = Vec::new();
    let mut chars = statement.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Equals);
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(c) => s.push(c),
                        None => {
                            return Err(PlaceError::Parse {
                                line,
                                message: "unterminated string".into(),
                            })
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            _ => {
                let mut w = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, ',' | '=' | '"') {
                        break;
                    }
                    w.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(w));
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# Board floorplan
DIMENSION FPGA 100,100;
AREAGROUP dram_ctrl = "platform/dram";
AREAGROUP top = None;
AREAGROUP user = None;
user in top;
LOCATION dram_ctrl 90,50;
DIMENSION dram_ctrl 20,100;
RESOURCES user 400;
ATTRIBUTE user EMPTYBOX = True;
"#;

    #[test]
    fn parses_sample() {
        let set = parse_constraints(SAMPLE).unwrap();
        assert_eq!(
            set.chip,
            Some(Chip {
                width: 100.0,
                height: 100.0
            })
        );
        let dram = &set.groups["dram_ctrl"];
        assert_eq!(dram.source_path.as_deref(), Some("platform/dram"));
        assert!(dram.is_placed());
        assert_eq!(dram.bounds(), Some((80.0, 0.0, 100.0, 100.0)));
        let user = &set.groups["user"];
        assert_eq!(user.area, 400.0);
        assert_eq!(user.parent.as_deref(), Some("top"));
        assert!(user.is_empty_box());
        assert_eq!(set.groups["top"].children, vec!["user".to_string()]);
    }

    #[test]
    fn corners_define_rectangle() {
        let set = parse_constraints(
            "DIMENSION FPGA 100,100;\nAREAGROUP d = None;\nLOWERLEFT d 80,0;\nUPPERRIGHT d 100,100;",
        )
        .unwrap();
        let d = &set.groups["d"];
        assert_eq!(d.centroid(), Some((90.0, 50.0)));
        assert_eq!(d.dimension.fixed(), Some((20.0, 100.0)));
    }

    #[test]
    fn lone_corner_is_rejected() {
        let err = parse_constraints("AREAGROUP d = None;\nLOWERLEFT d 0,0;").unwrap_err();
        assert!(matches!(err, PlaceError::Parse { line: 2, .. }));
    }

    #[test]
    fn chip_declared_twice_is_config_error() {
        let err = parse_constraints("DIMENSION FPGA 10,10;\nDIMENSION FPGA 20,20;").unwrap_err();
        assert!(matches!(err, PlaceError::Config(_)));
    }

    #[test]
    fn nested_parents_are_rejected() {
        let src = "AREAGROUP a = None; AREAGROUP b = None; AREAGROUP c = None;\nb in a;\nc in b;";
        let err = parse_constraints(src).unwrap_err();
        assert!(matches!(err, PlaceError::Config(_)));
    }

    #[test]
    fn undeclared_group_is_parse_error() {
        let err = parse_constraints("DIMENSION FPGA 10,10;\n\nLOCATION ghost 1,1;").unwrap_err();
        match err {
            PlaceError::Parse { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("ghost"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn statements_may_span_lines_and_carry_comments() {
        let src = "AREAGROUP a =   # trailing comment\n  \"x;y\";\nRESOURCES a\n 12;";
        let set = parse_constraints(src).unwrap();
        assert_eq!(set.groups["a"].source_path.as_deref(), Some("x;y"));
        assert_eq!(set.groups["a"].area, 12.0);
    }

    #[test]
    fn unknown_statement_is_rejected() {
        let err = parse_constraints("FROB a b;").unwrap_err();
        assert!(matches!(err, PlaceError::Parse { line: 1, .. }));
    }

    #[test]
    fn bad_pair_is_rejected() {
        let err = parse_constraints("DIMENSION FPGA 10;").unwrap_err();
        assert!(matches!(err, PlaceError::Parse { .. }));
    }
}

//! Path glob expansion.
//!
//! Patterns are split on `/` and matched one component at a time, so a
//! wildcard never crosses a directory boundary. Supported syntax within a
//! component: `*`, `?`, `[abc]`, `[a-z]` and `[!abc]`. A leading `.` is only
//! matched by a literal `.`.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::StageError;

/// Expand `pattern` relative to `base`, returning matches in sorted order.
pub fn expand(base: &Path, pattern: &str) -> Result<Vec<PathBuf>, StageError> {
  let components: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty() && *c != ".").collect();
  if components.is_empty() {
    return Err(StageError::InvalidPattern {
      pattern: pattern.to_string(),
      reason: "empty pattern".to_string(),
    });
  }

  let mut current = vec![base.to_path_buf()];
  for component in components {
    let compiled = Component::compile(component).map_err(|reason| StageError::InvalidPattern {
      pattern: pattern.to_string(),
      reason,
    })?;

    let mut next = Vec::new();
    for dir in &current {
      match &compiled {
        Component::Literal(name) => {
          let candidate = dir.join(name);
          if candidate.symlink_metadata().is_ok() {
            next.push(candidate);
          }
        }
        Component::Pattern(tokens) => {
          if !dir.is_dir() {
            continue;
          }
          for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| StageError::Io {
              path: dir.clone(),
              source: e.into(),
            })?;
            if let Some(name) = entry.file_name().to_str()
              && matches(tokens, name)
            {
              next.push(entry.into_path());
            }
          }
        }
      }
    }

    if next.is_empty() {
      return Ok(next);
    }
    current = next;
  }

  Ok(current)
}

enum Component {
  Literal(String),
  Pattern(Vec<Token>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
  Char(char),
  Any,
  Star,
  Class { negated: bool, ranges: Vec<(char, char)> },
}

impl Component {
  fn compile(component: &str) -> Result<Self, String> {
    if !component.contains(['*', '?', '[']) {
      return Ok(Component::Literal(component.to_string()));
    }

    let mut tokens = Vec::new();
    let mut chars = component.chars().peekable();
    while let Some(c) = chars.next() {
      match c {
        '*' => {
          if tokens.last() != Some(&Token::Star) {
            tokens.push(Token::Star);
          }
        }
        '?' => tokens.push(Token::Any),
        '[' => {
          let negated = chars.next_if(|&c| c == '!' || c == '^').is_some();
          let mut ranges = Vec::new();
          let mut closed = false;
          let mut first = true;
          while let Some(c) = chars.next() {
            if c == ']' && !first {
              closed = true;
              break;
            }
            first = false;
            if chars.peek() == Some(&'-') {
              chars.next();
              match chars.next() {
                Some(']') => {
                  ranges.push((c, c));
                  ranges.push(('-', '-'));
                  closed = true;
                  break;
                }
                Some(end) => ranges.push((c, end)),
                None => break,
              }
            } else {
              ranges.push((c, c));
            }
          }
          if !closed {
            return Err(format!("unclosed character class in '{component}'"));
          }
          tokens.push(Token::Class { negated, ranges });
        }
        other => tokens.push(Token::Char(other)),
      }
    }
    Ok(Component::Pattern(tokens))
  }
}

fn matches(tokens: &[Token], name: &str) -> bool {
  let chars: Vec<char> = name.chars().collect();
  if chars.first() == Some(&'.') && tokens.first() != Some(&Token::Char('.')) {
    return false;
  }
  match_from(tokens, &chars)
}

fn match_from(tokens: &[Token], chars: &[char]) -> bool {
  let Some((token, rest)) = tokens.split_first() else {
    return chars.is_empty();
  };
  match token {
    Token::Star => (0..=chars.len()).any(|skip| match_from(rest, &chars[skip..])),
    Token::Any => !chars.is_empty() && match_from(rest, &chars[1..]),
    Token::Char(expected) => chars.first() == Some(expected) && match_from(rest, &chars[1..]),
    Token::Class { negated, ranges } => match chars.first() {
      Some(&c) => {
        let hit = ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
        hit != *negated && match_from(rest, &chars[1..])
      }
      None => false,
    },
  }
}

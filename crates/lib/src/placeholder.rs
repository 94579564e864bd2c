//! Placeholder parsing and substitution for formula arguments.
//!
//! Formula arguments, paths and environment values may reference values that
//! are only known once options are resolved and the build layout is chosen.
//! Substitution happens per argv element, so a substituted value can never
//! split into several arguments or be reinterpreted by a shell.
//!
//! # Placeholder Formats
//!
//! - `${prefix}` - the install prefix
//! - `${bin}`, `${lib}`, `${share}`, `${doc}` - standard prefix subdirectories
//! - `${source}` - the unpacked source tree the build runs in
//! - `${testpath}` - the scratch directory test runs execute in
//! - `${option:NAME}` - the resolved value of option `NAME`
//!
//! # Escaping
//!
//! A lone `$` passes through unchanged, so `$(MAKE)` or `$HOME` need no
//! escaping. Use `$${` to produce a literal `${`.
//!
//! # Example
//!
//! ```
//! use kiln_lib::placeholder::{parse, DirKind, Placeholder, Segment};
//!
//! let segments = parse("--prefix=${prefix}").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("--prefix=".to_string()),
//!     Segment::Placeholder(Placeholder::Dir(DirKind::Prefix)),
//! ]);
//! ```

use thiserror::Error;

/// A directory known from the build layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirKind {
  Prefix,
  Bin,
  Lib,
  Share,
  Doc,
  Source,
  TestPath,
}

impl DirKind {
  fn from_name(name: &str) -> Option<Self> {
    match name {
      "prefix" => Some(Self::Prefix),
      "bin" => Some(Self::Bin),
      "lib" => Some(Self::Lib),
      "share" => Some(Self::Share),
      "doc" => Some(Self::Doc),
      "source" => Some(Self::Source),
      "testpath" => Some(Self::TestPath),
      _ => None,
    }
  }
}

/// A parsed placeholder reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
  /// `${prefix}`, `${bin}`, ... - a layout directory
  Dir(DirKind),

  /// `${option:NAME}` - a resolved option value
  Option(String),
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no placeholders)
  Literal(String),

  /// A placeholder to be resolved
  Placeholder(Placeholder),
}

/// Errors that can occur during placeholder parsing or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("unknown placeholder: {0}")]
  Unknown(String),

  #[error("malformed placeholder: {0}")]
  Malformed(String),

  #[error("unresolved option: {0}")]
  UnresolvedOption(String),
}

/// Trait for resolving placeholder values.
pub trait Resolver {
  /// Resolve a layout directory.
  fn resolve_dir(&self, kind: DirKind) -> Result<String, PlaceholderError>;

  /// Resolve an option value by name.
  fn resolve_option(&self, name: &str) -> Result<String, PlaceholderError>;
}

/// Parse a string containing placeholders into segments.
///
/// # Errors
///
/// Returns an error if a placeholder is unclosed, empty, or of an unknown kind.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    match chars.peek() {
      Some((_, '$')) => {
        chars.next();
        if let Some((_, '{')) = chars.peek() {
          // Escaped: $${ -> ${ (literal)
          chars.next();
          literal.push_str("${");
        } else {
          literal.push_str("$$");
        }
      }
      Some((_, '{')) => {
        chars.next();

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }

        let mut content = String::new();
        let mut found_close = false;
        for (_, c) in chars.by_ref() {
          if c == '}' {
            found_close = true;
            break;
          }
          content.push(c);
        }

        if !found_close {
          return Err(PlaceholderError::Unclosed(pos));
        }

        segments.push(Segment::Placeholder(parse_placeholder_content(&content)?));
      }
      _ => literal.push('$'),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Parse the content inside a placeholder (everything between `${` and `}`).
fn parse_placeholder_content(content: &str) -> Result<Placeholder, PlaceholderError> {
  if let Some(kind) = DirKind::from_name(content) {
    return Ok(Placeholder::Dir(kind));
  }

  match content.split_once(':') {
    Some(("option", name)) if !name.is_empty() => Ok(Placeholder::Option(name.to_string())),
    Some(("option", _)) => Err(PlaceholderError::Malformed(format!("option placeholder without a name: '{content}'"))),
    Some((kind, _)) => Err(PlaceholderError::Unknown(kind.to_string())),
    None if content.is_empty() => Err(PlaceholderError::Malformed("empty placeholder".to_string())),
    None => Err(PlaceholderError::Unknown(content.to_string())),
  }
}

/// Names of all options referenced by placeholders in `input`.
pub fn referenced_options(input: &str) -> Result<Vec<String>, PlaceholderError> {
  Ok(
    parse(input)?
      .into_iter()
      .filter_map(|segment| match segment {
        Segment::Placeholder(Placeholder::Option(name)) => Some(name),
        _ => None,
      })
      .collect(),
  )
}

/// Substitute all placeholders in a string using the provided resolver.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let segments = parse(input)?;
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(s) => result.push_str(&s),
      Segment::Placeholder(Placeholder::Dir(kind)) => result.push_str(&resolver.resolve_dir(kind)?),
      Segment::Placeholder(Placeholder::Option(name)) => result.push_str(&resolver.resolve_option(&name)?),
    }
  }

  Ok(result)
}

/// Substitute placeholders in every element of an argument list.
pub fn substitute_all(inputs: &[String], resolver: &impl Resolver) -> Result<Vec<String>, PlaceholderError> {
  inputs.iter().map(|input| substitute(input, resolver)).collect()
}

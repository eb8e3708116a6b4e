//! A small HTML-like markup parser.
//!
//! Handles the subset templates are written in:
//! - elements with quoted, unquoted and boolean attributes
//! - void elements (`<input>`, `<br>`) and self-closing tags (`<x/>`)
//! - text with the common character entities
//! - comments, which are dropped
//!
//! Whitespace-only text between tags is dropped as well.

use weft_core::{Error, Result};

/// A parsed markup node.
#[derive(Clone, Debug, PartialEq)]
pub enum Markup {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<Markup>,
    },
    Text(String),
}

/// Elements that never have children or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Returns true if `tag` is a void element.
pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parses a markup string into its top-level nodes.
pub fn parse_markup(input: &str) -> Result<Vec<Markup>> {
    let mut parser = Parser::new(input);
    parser.parse_nodes(None)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::invalid_markup(message, self.pos)
    }

    /// Parses nodes until end of input, or until the closing tag of `open`.
    fn parse_nodes(&mut self, open: Option<&str>) -> Result<Vec<Markup>> {
        let mut nodes = Vec::new();
        loop {
            if self.pos >= self.input.len() {
                return match open {
                    Some(tag) => Err(self.error(format!("Unclosed <{tag}>"))),
                    None => Ok(nodes),
                };
            }
            if self.eat("<!--") {
                match self.rest().find("-->") {
                    Some(end) => self.pos += end + 3,
                    None => return Err(self.error("Unterminated comment")),
                }
            } else if self.rest().starts_with("</") {
                let start = self.pos;
                self.pos += 2;
                let name = self.parse_name();
                self.skip_whitespace();
                if !self.eat(">") {
                    return Err(self.error("Expected '>'"));
                }
                return match open {
                    Some(tag) if tag == name => Ok(nodes),
                    Some(tag) => Err(Error::invalid_markup(
                        format!("Expected </{tag}>, found </{name}>"),
                        start,
                    )),
                    None => Err(Error::invalid_markup(
                        format!("Unexpected </{name}>"),
                        start,
                    )),
                };
            } else if self.at_tag_start() {
                nodes.push(self.parse_element()?);
            } else {
                let text = self.parse_text();
                if !text.trim().is_empty() {
                    nodes.push(Markup::Text(text));
                }
            }
        }
    }

    fn at_tag_start(&self) -> bool {
        let mut chars = self.rest().chars();
        chars.next() == Some('<') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            self.advance();
        }
        self.input[start..self.pos].to_ascii_lowercase()
    }

    fn parse_element(&mut self) -> Result<Markup> {
        self.advance(); // '<'
        let tag = self.parse_name();
        let mut attributes: Vec<(String, String)> = Vec::new();
        let self_closing = loop {
            self.skip_whitespace();
            if self.eat("/>") {
                break true;
            }
            if self.eat(">") {
                break false;
            }
            if self.pos >= self.input.len() {
                return Err(self.error(format!("Unterminated <{tag}> tag")));
            }
            let (name, value) = self.parse_attribute()?;
            // first occurrence wins
            if !attributes.iter().any(|(n, _)| *n == name) {
                attributes.push((name, value));
            }
        };

        let children = if self_closing || is_void(&tag) {
            Vec::new()
        } else {
            self.parse_nodes(Some(&tag))?
        };
        Ok(Markup::Element {
            tag,
            attributes,
            children,
        })
    }

    fn parse_attribute(&mut self) -> Result<(String, String)> {
        let start = self.pos;
        while self.peek().is_some_and(is_attribute_char) {
            self.advance();
        }
        if start == self.pos {
            return Err(self.error("Expected attribute name"));
        }
        let name = self.input[start..self.pos].to_string();
        self.skip_whitespace();
        if !self.eat("=") {
            return Ok((name, String::new()));
        }
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.advance();
                let begin = self.pos;
                match self.rest().find(quote) {
                    Some(len) => {
                        self.pos += len + 1;
                        decode_entities(&self.input[begin..begin + len])
                    }
                    None => return Err(self.error("Unterminated attribute value")),
                }
            }
            _ => {
                let begin = self.pos;
                while self.peek().is_some_and(|c| !c.is_whitespace() && c != '>') {
                    self.advance();
                }
                decode_entities(&self.input[begin..self.pos])
            }
        };
        Ok((name, value))
    }

    fn parse_text(&mut self) -> String {
        let start = self.pos;
        // A '<' that does not open a tag is text.
        self.advance();
        while let Some(c) = self.peek() {
            if c == '<'
                && (self.at_tag_start()
                    || self.rest().starts_with("</")
                    || self.rest().starts_with("<!--"))
            {
                break;
            }
            self.advance();
        }
        decode_entities(&self.input[start..self.pos])
    }
}

fn is_attribute_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '"' | '\'')
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|end| {
            let entity = &rest[1..end];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix('#')
                    .and_then(|n| n.parse::<u32>().ok())
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escapes text for output between tags.
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escapes text for output inside a double-quoted attribute.
pub fn escape_attribute(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}

//! CSS selector parsing and matching.
//!
//! Supported syntax: type (`li`), universal (`*`), class (`.item`), id
//! (`#app`), attribute presence (`[href]`) and equality (`[type=text]`,
//! quoted or not), `:root`, the descendant (space) and child (`>`)
//! combinators, and comma-separated lists.

use std::fmt;

use crate::document::Node;
use crate::error::DomError;

#[derive(Clone, Debug, PartialEq, Eq)]
enum AttrMatch {
    Exists(String),
    Equals(String, String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attributes: Vec<AttrMatch>,
    root: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// A compound selector chain, stored left to right. The combinator of the
/// first part is unused.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Complex {
    parts: Vec<(Combinator, Compound)>,
}

/// A parsed selector list.
#[derive(Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({:?})", self.source)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Selector {
    /// Parse a selector list.
    ///
    /// ```rust
    /// use cycle_dom::Selector;
    ///
    /// assert!(Selector::parse("ul > li.item, :root [data-id=\"3\"]").is_ok());
    /// assert!(Selector::parse("li..x").is_err());
    /// assert!(Selector::parse("").is_err());
    /// ```
    pub fn parse(source: &str) -> Result<Self, DomError> {
        let source = source.trim();
        let alternatives = Parser::new(source)
            .selector_list()
            .map_err(|reason| DomError::InvalidSelector {
                selector: source.to_string(),
                reason,
            })?;
        Ok(Self {
            source: source.to_string(),
            alternatives,
        })
    }

    /// The selector text, trimmed.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check whether some alternative can only match the scope node itself,
    /// i.e. ends in a `:root` compound.
    pub fn targets_root(&self) -> bool {
        self.alternatives
            .iter()
            .any(|c| c.parts.last().is_some_and(|(_, compound)| compound.root))
    }

    /// Check whether `node` matches. `:root` matches `scope`.
    pub fn matches(&self, node: &Node, scope: &Node) -> bool {
        self.alternatives.iter().any(|complex| {
            let last = complex.parts.len() - 1;
            match_from(&complex.parts, last, node, scope)
        })
    }
}

/// Match `parts[..=index]` with `parts[index]` on `node`, walking ancestors
/// right to left.
fn match_from(parts: &[(Combinator, Compound)], index: usize, node: &Node, scope: &Node) -> bool {
    let (combinator, compound) = &parts[index];
    if !compound.matches(node, scope) {
        return false;
    }
    if index == 0 {
        return true;
    }
    match combinator {
        Combinator::Child => node
            .parent()
            .is_some_and(|parent| match_from(parts, index - 1, &parent, scope)),
        Combinator::Descendant => {
            let mut current = node.parent();
            while let Some(ancestor) = current {
                if match_from(parts, index - 1, &ancestor, scope) {
                    return true;
                }
                current = ancestor.parent();
            }
            false
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.ids.is_empty()
            && self.classes.is_empty()
            && self.attributes.is_empty()
            && !self.root
    }

    fn matches(&self, node: &Node, scope: &Node) -> bool {
        let Some(tag) = node.tag() else {
            return false;
        };
        if let Some(wanted) = &self.tag {
            if wanted != "*" && *wanted != tag {
                return false;
            }
        }
        if self.root && node != scope {
            return false;
        }
        if !self
            .ids
            .iter()
            .all(|id| node.attribute("id").as_deref() == Some(id.as_str()))
        {
            return false;
        }
        if !self.classes.iter().all(|class| node.has_class(class)) {
            return false;
        }
        self.attributes.iter().all(|a| match a {
            AttrMatch::Exists(name) => node.attribute(name).is_some(),
            AttrMatch::Equals(name, value) => node.attribute(name).as_deref() == Some(value.as_str()),
        })
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn selector_list(&mut self) -> Result<Vec<Complex>, String> {
        let mut alternatives = vec![self.complex()?];
        while self.peek() == Some(',') {
            self.pos += 1;
            self.skip_whitespace();
            alternatives.push(self.complex()?);
        }
        if let Some(c) = self.peek() {
            return Err(format!("unexpected '{}' at {}", c, self.pos));
        }
        Ok(alternatives)
    }

    fn complex(&mut self) -> Result<Complex, String> {
        let mut parts = vec![(Combinator::Descendant, self.compound()?)];
        loop {
            let spaced = self.skip_whitespace();
            let combinator = match self.peek() {
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    Combinator::Child
                }
                None | Some(',') => break,
                Some(_) if spaced => Combinator::Descendant,
                Some(c) => return Err(format!("unexpected '{}' at {}", c, self.pos)),
            };
            parts.push((combinator, self.compound()?));
        }
        Ok(Complex { parts })
    }

    fn compound(&mut self) -> Result<Compound, String> {
        let mut compound = Compound::default();
        if self.peek() == Some('*') {
            self.pos += 1;
            compound.tag = Some("*".to_string());
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.ident("tag name")?.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident("class name")?);
                }
                Some('#') => {
                    self.pos += 1;
                    compound.ids.push(self.ident("id")?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attributes.push(self.attribute()?);
                }
                Some(':') => {
                    self.pos += 1;
                    let pseudo = self.ident("pseudo-class")?;
                    if pseudo != "root" {
                        return Err(format!("unsupported pseudo-class ':{}'", pseudo));
                    }
                    compound.root = true;
                }
                _ => break,
            }
        }

        if compound.is_empty() {
            return match self.peek() {
                Some(c) => Err(format!("expected a selector at {}, found '{}'", self.pos, c)),
                None => Err("expected a selector".to_string()),
            };
        }
        Ok(compound)
    }

    fn ident(&mut self, what: &str) -> Result<String, String> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(format!("empty {} at {}", what, start));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn attribute(&mut self) -> Result<AttrMatch, String> {
        self.skip_whitespace();
        let name = self.ident("attribute name")?;
        self.skip_whitespace();
        let matcher = match self.peek() {
            Some(']') => AttrMatch::Exists(name),
            Some('=') => {
                self.pos += 1;
                self.skip_whitespace();
                let value = match self.peek() {
                    Some(quote @ ('"' | '\'')) => {
                        self.pos += 1;
                        let start = self.pos;
                        while self.peek().is_some_and(|c| c != quote) {
                            self.pos += 1;
                        }
                        if self.peek().is_none() {
                            return Err("unterminated string".to_string());
                        }
                        let value: String = self.chars[start..self.pos].iter().collect();
                        self.pos += 1;
                        value
                    }
                    _ => self.ident("attribute value")?,
                };
                self.skip_whitespace();
                AttrMatch::Equals(name, value)
            }
            _ => return Err(format!("expected ']' or '=' at {}", self.pos)),
        };
        if self.peek() != Some(']') {
            return Err(format!("expected ']' at {}", self.pos));
        }
        self.pos += 1;
        Ok(matcher)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

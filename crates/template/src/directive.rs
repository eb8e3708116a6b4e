//! Directive attributes.
//!
//! General directives start with `v-` (`v-text`, `v-model`, `v-on:click`).
//! Two sigils are shorthands: `:name` for `v-bind:name` and `@type` for
//! `v-on:type`.

use std::sync::LazyLock;

use regex::Regex;
use weft_core::{Error, Path, Result};

/// Prefix of general directives.
pub const PREFIX: &str = "v-";

/// `(item, index) in collection`, parentheses optional.
static FOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:\((?P<paren>[^()]*)\)\s*|(?P<bare>[^()]*?)\s+)in\s+(?P<collection>[A-Za-z_$][\w$]*(?:\.[\w$]+)*)\s*$",
    )
    .expect("valid v-for pattern")
});

static FOR_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<item>[A-Za-z_$][\w$]*)\s*(?:,\s*(?P<index>[A-Za-z_$][\w$]*)\s*)?$")
        .expect("valid v-for head pattern")
});

/// A parsed `v-for` expression.
#[derive(Clone, Debug, PartialEq)]
pub struct ForSpec {
    pub item: String,
    pub index: Option<String>,
    pub collection: Path,
}

impl ForSpec {
    pub fn parse(expression: &str) -> Result<Self> {
        let caps = FOR_PATTERN
            .captures(expression)
            .ok_or_else(|| Error::invalid_for(expression))?;
        let head = caps
            .name("paren")
            .or_else(|| caps.name("bare"))
            .map_or("", |m| m.as_str());
        let head = FOR_HEAD
            .captures(head)
            .ok_or_else(|| Error::invalid_for(expression))?;
        let collection = Path::parse(&caps["collection"]).map_err(|_| Error::invalid_for(expression))?;
        Ok(Self {
            item: head["item"].to_string(),
            index: head.name("index").map(|m| m.as_str().to_string()),
            collection,
        })
    }
}

/// A recognized directive attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum Directive {
    Text(String),
    Html(String),
    Model(Path),
    For(ForSpec),
    Bind { attribute: String, expression: String },
    On { event: String, method: String },
    Unknown { name: String, value: String },
}

impl Directive {
    /// Returns true if `name` is a directive attribute.
    pub fn is_directive(name: &str) -> bool {
        name.starts_with(PREFIX) || name.starts_with(':') || name.starts_with('@')
    }

    /// Classifies an attribute. Plain attributes yield `Ok(None)`.
    ///
    /// Fails with `InvalidForExpression` for a malformed `v-for` and with
    /// `InvalidDirective` for other malformed directives.
    pub fn parse(name: &str, value: &str) -> Result<Option<Self>> {
        let directive = if let Some(rest) = name.strip_prefix(PREFIX) {
            match rest.split_once(':') {
                Some(("bind", attribute)) => Self::bind(name, attribute, value)?,
                Some(("on", event)) => Self::on(name, event, value)?,
                _ => match rest {
                    "text" => Directive::Text(value.trim().to_string()),
                    "html" => Directive::Html(value.trim().to_string()),
                    "model" => Directive::Model(Path::parse(value).map_err(|_| {
                        Error::invalid_directive(name, value, "v-model needs a property path")
                    })?),
                    "for" => Directive::For(ForSpec::parse(value)?),
                    _ => Directive::Unknown {
                        name: name.to_string(),
                        value: value.to_string(),
                    },
                },
            }
        } else if let Some(attribute) = name.strip_prefix(':') {
            Self::bind(name, attribute, value)?
        } else if let Some(event) = name.strip_prefix('@') {
            Self::on(name, event, value)?
        } else {
            return Ok(None);
        };
        Ok(Some(directive))
    }

    fn bind(name: &str, attribute: &str, value: &str) -> Result<Self> {
        if attribute.is_empty() {
            return Err(Error::invalid_directive(name, value, "missing attribute name"));
        }
        Ok(Directive::Bind {
            attribute: attribute.to_string(),
            expression: value.trim().to_string(),
        })
    }

    fn on(name: &str, event: &str, value: &str) -> Result<Self> {
        if event.is_empty() {
            return Err(Error::invalid_directive(name, value, "missing event type"));
        }
        Ok(Directive::On {
            event: event.to_string(),
            method: value.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn test_for_grammar() {
        let spec = ForSpec::parse("(item, idx) in items").unwrap();
        assert_eq!(spec.item, "item");
        assert_eq!(spec.index.as_deref(), Some("idx"));
        assert_eq!(spec.collection, path("items"));

        let spec = ForSpec::parse("row in table.rows").unwrap();
        assert_eq!(spec.item, "row");
        assert_eq!(spec.index, None);
        assert_eq!(spec.collection, path("table.rows"));

        let spec = ForSpec::parse("  (x)in list ").unwrap();
        assert_eq!(spec.item, "x");

        let spec = ForSpec::parse("a, i in list").unwrap();
        assert_eq!(spec.index.as_deref(), Some("i"));
    }

    #[test]
    fn test_for_grammar_rejects() {
        for bad in [
            "items",
            "in items",
            "(a, b, c) in items",
            "(a in items",
            "a in ",
            "a of items",
            "1x in items",
            "a in items + 1",
        ] {
            assert!(
                matches!(ForSpec::parse(bad), Err(Error::InvalidForExpression { .. })),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(Directive::parse("class", "x").unwrap(), None);
        assert_eq!(
            Directive::parse("v-text", " msg ").unwrap(),
            Some(Directive::Text("msg".into()))
        );
        assert_eq!(
            Directive::parse("v-model", "form.name").unwrap(),
            Some(Directive::Model(path("form.name")))
        );
        assert_eq!(
            Directive::parse(":href", "url").unwrap(),
            Directive::parse("v-bind:href", "url").unwrap()
        );
        assert_eq!(
            Directive::parse("@click", "go").unwrap(),
            Some(Directive::On {
                event: "click".into(),
                method: "go".into()
            })
        );
        assert!(matches!(
            Directive::parse("v-cloak", "").unwrap(),
            Some(Directive::Unknown { .. })
        ));
        assert!(Directive::is_directive("@x"));
        assert!(!Directive::is_directive("id"));
    }

    #[test]
    fn test_classify_errors() {
        assert!(matches!(
            Directive::parse("v-for", "nope"),
            Err(Error::InvalidForExpression { .. })
        ));
        assert!(matches!(
            Directive::parse("v-model", "a + b"),
            Err(Error::InvalidDirective { .. })
        ));
        assert!(matches!(
            Directive::parse("@", "go"),
            Err(Error::InvalidDirective { .. })
        ));
        assert!(matches!(
            Directive::parse("v-bind:", "x"),
            Err(Error::InvalidDirective { .. })
        ));
    }
}

//! Type comparability oracle.
//!
//! Every finder asks the same question, "does the type a mod expects look like the type
//! the host actually has?", and every diagnostic names types the same way. Both answers
//! come from [`TypeOracle`], which works on the canonical type names produced by
//! [`crate::metadata::module::Module::type_name`].
//!
//! Comparison and display are separate: [`TypeOracle::looks_like_same_type`] never looks
//! at the configured well-known namespaces, and [`TypeOracle::friendly_name`] never
//! influences a compatibility decision.
//!
//! # Examples
//!
//! ```rust
//! use modcompat::compat::TypeOracle;
//!
//! let oracle = TypeOracle::default();
//! assert!(oracle.looks_like_same_type(
//!     "System.Collections.Generic.List`1<System.String>",
//!     "System.Collections.Generic.List<!0>",
//! ));
//! assert!(!oracle.looks_like_same_type("System.Action`1", "System.Action`2"));
//! assert_eq!(
//!     oracle.friendly_name("System.Collections.Generic.List`1<System.Int32[]>"),
//!     "List<int[]>"
//! );
//! ```

use crate::compat::config::OracleConfig;

/// Parsed form of a canonical type name.
#[derive(Debug, Clone, PartialEq)]
enum TypeShape {
    /// `!n` or `!!n`, matches any type
    Placeholder(String),
    Named {
        /// Namespace and name; the arity marker is removed when arguments follow
        head: String,
        /// Arity marker that was removed from `head`, kept for display
        arity: Option<String>,
        args: Vec<TypeShape>,
        /// Array, by-ref and pointer decorations in order, e.g. `[]&`
        suffix: String,
    },
}

impl TypeShape {
    fn parse(name: &str) -> TypeShape {
        let mut chars = name.trim().chars().peekable();
        Self::parse_inner(&mut chars)
    }

    fn parse_inner(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> TypeShape {
        let mut head = String::new();
        while let Some(&c) = chars.peek() {
            if matches!(c, '<' | '>' | ',' | '[' | '&' | '*') {
                break;
            }
            head.push(c);
            chars.next();
        }
        let head = head.trim().replace('+', "/");

        let mut args = Vec::new();
        if chars.peek() == Some(&'<') {
            chars.next();
            loop {
                args.push(Self::parse_inner(chars));
                match chars.next() {
                    Some(',') => continue,
                    _ => break,
                }
            }
        }

        let mut suffix = String::new();
        while let Some(&c) = chars.peek() {
            match c {
                '[' => {
                    for c in chars.by_ref() {
                        suffix.push(c);
                        if c == ']' {
                            break;
                        }
                    }
                }
                '&' | '*' => {
                    suffix.push(c);
                    chars.next();
                }
                _ => break,
            }
        }

        if head.starts_with('!') && args.is_empty() {
            return TypeShape::Placeholder(head + &suffix);
        }

        let (head, arity) = match head.rfind('`') {
            Some(tick) if !args.is_empty() => {
                let arity = head[tick..].to_string();
                (head[..tick].to_string(), Some(arity))
            }
            _ => (head, None),
        };

        TypeShape::Named {
            head,
            arity,
            args,
            suffix,
        }
    }

    fn matches(&self, other: &TypeShape) -> bool {
        match (self, other) {
            (TypeShape::Placeholder(_), _) | (_, TypeShape::Placeholder(_)) => true,
            (
                TypeShape::Named {
                    head,
                    args,
                    suffix,
                    ..
                },
                TypeShape::Named {
                    head: other_head,
                    args: other_args,
                    suffix: other_suffix,
                    ..
                },
            ) => {
                head == other_head
                    && suffix == other_suffix
                    && args.len() == other_args.len()
                    && args.iter().zip(other_args).all(|(a, b)| a.matches(b))
            }
        }
    }
}

/// Answers type comparability questions for the finders.
#[derive(Debug, Clone, Default)]
pub struct TypeOracle {
    config: OracleConfig,
}

impl TypeOracle {
    /// Oracle with the given display configuration.
    #[must_use]
    pub fn new(config: OracleConfig) -> Self {
        TypeOracle { config }
    }

    /// Whether `expected` (as referenced by a mod) and `actual` (as defined by the host)
    /// should be treated as the same type.
    ///
    /// Generic arity markers are dropped only where an argument list follows, generic
    /// parameter placeholders match any type, and nested type separators `+` and `/`
    /// are treated alike.
    #[must_use]
    pub fn looks_like_same_type(&self, expected: &str, actual: &str) -> bool {
        if expected == actual {
            return true;
        }
        TypeShape::parse(expected).matches(&TypeShape::parse(actual))
    }

    /// Short display name of a canonical type name, for diagnostics.
    #[must_use]
    pub fn friendly_name(&self, full_name: &str) -> String {
        let mut out = String::new();
        self.write_friendly(&TypeShape::parse(full_name), &mut out);
        out
    }

    fn write_friendly(&self, shape: &TypeShape, out: &mut String) {
        match shape {
            TypeShape::Placeholder(name) => out.push_str(name),
            TypeShape::Named {
                head,
                arity,
                args,
                suffix,
            } => {
                if let Some(keyword) = primitive_keyword(head) {
                    out.push_str(keyword);
                } else {
                    out.push_str(self.strip_known_namespace(head));
                    if args.is_empty() {
                        if let Some(arity) = arity {
                            out.push_str(arity);
                        }
                    }
                }

                if !args.is_empty() {
                    out.push('<');
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        self.write_friendly(arg, out);
                    }
                    out.push('>');
                }
                out.push_str(suffix);
            }
        }
    }

    fn strip_known_namespace<'a>(&self, head: &'a str) -> &'a str {
        match head.rfind('.') {
            Some(dot)
                if self
                    .config
                    .well_known_namespaces
                    .iter()
                    .any(|namespace| namespace == &head[..dot]) =>
            {
                &head[dot + 1..]
            }
            _ => head,
        }
    }
}

fn primitive_keyword(name: &str) -> Option<&'static str> {
    let keyword = match name {
        "System.Boolean" => "bool",
        "System.Byte" => "byte",
        "System.SByte" => "sbyte",
        "System.Char" => "char",
        "System.Decimal" => "decimal",
        "System.Double" => "double",
        "System.Single" => "float",
        "System.Int16" => "short",
        "System.UInt16" => "ushort",
        "System.Int32" => "int",
        "System.UInt32" => "uint",
        "System.Int64" => "long",
        "System.UInt64" => "ulong",
        "System.Object" => "object",
        "System.String" => "string",
        "System.Void" => "void",
        _ => return None,
    };
    Some(keyword)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_names() {
        let oracle = TypeOracle::default();
        assert!(oracle.looks_like_same_type("System.String", "System.String"));
        assert!(!oracle.looks_like_same_type("System.String", "System.Int32"));
        assert!(!oracle.looks_like_same_type("Host.Widget", "Other.Widget"));
    }

    #[test]
    fn arity_markers_before_arguments() {
        let oracle = TypeOracle::default();
        assert!(oracle.looks_like_same_type(
            "System.Collections.Generic.List`1<System.String>",
            "System.Collections.Generic.List<System.String>"
        ));
        assert!(!oracle.looks_like_same_type(
            "System.Collections.Generic.List`1<System.String>",
            "System.Collections.Generic.List`1<System.Int32>"
        ));
        assert!(!oracle.looks_like_same_type("System.Action`1", "System.Action`2"));
        assert!(!oracle.looks_like_same_type(
            "System.Func`2<System.Int32,System.String>",
            "System.Func`1<System.String>"
        ));
    }

    #[test]
    fn placeholders_match_anything() {
        let oracle = TypeOracle::default();
        assert!(oracle.looks_like_same_type("!0", "Host.Widget"));
        assert!(oracle.looks_like_same_type("Host.Widget[]", "!!1"));
        assert!(oracle.looks_like_same_type(
            "System.Collections.Generic.Dictionary`2<System.String,Host.Widget>",
            "System.Collections.Generic.Dictionary`2<!0,!1>"
        ));
    }

    #[test]
    fn decorations_must_agree() {
        let oracle = TypeOracle::default();
        assert!(!oracle.looks_like_same_type("System.Int32[]", "System.Int32"));
        assert!(!oracle.looks_like_same_type("System.Int32[]", "System.Int32[,]"));
        assert!(!oracle.looks_like_same_type("System.Int32&", "System.Int32"));
        assert!(oracle.looks_like_same_type("Host.Outer+Inner", "Host.Outer/Inner"));
    }

    #[test]
    fn friendly_names() {
        let oracle = TypeOracle::default();
        assert_eq!(oracle.friendly_name("System.Boolean"), "bool");
        assert_eq!(oracle.friendly_name("System.Int32"), "int");
        assert_eq!(oracle.friendly_name("System.String[]"), "string[]");
        assert_eq!(oracle.friendly_name("System.DateTime"), "DateTime");
        assert_eq!(oracle.friendly_name("Host.Widget"), "Host.Widget");
        assert_eq!(
            oracle.friendly_name(
                "System.Collections.Generic.Dictionary`2<System.String,Host.Widget>"
            ),
            "Dictionary<string, Host.Widget>"
        );
        assert_eq!(oracle.friendly_name("System.Action`1"), "Action`1");
        assert_eq!(oracle.friendly_name("!!0&"), "!!0&");
    }

    #[test]
    fn display_does_not_affect_comparison() {
        let oracle = TypeOracle::new(OracleConfig::default().well_known_namespaces(vec![
            "System".to_string(),
            "Host".to_string(),
        ]));
        assert_eq!(oracle.friendly_name("Host.Widget"), "Widget");
        assert!(!oracle.looks_like_same_type("Host.Widget", "Widget"));
    }
}

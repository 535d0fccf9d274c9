//! User-defined methods

use super::blocks::{BlockMap, split_keyword};
use crate::error::{BooseError, Result};
use std::collections::HashMap;
use std::rc::Rc;

/// A parsed `method name(params) ... endmethod` block
#[derive(Debug, Clone)]
pub struct MethodDefinition {
    /// Name as written in the definition
    pub name: String,
    pub params: Vec<String>,
    /// Body lines, verbatim
    pub body: Vec<String>,
    /// 1-based program line of `body[0]`
    pub first_line: usize,
    /// Block structure of the body, matched once at definition time
    pub blocks: BlockMap,
}

impl MethodDefinition {
    /// Build a definition from its header text (everything after `method`)
    /// and its body lines.
    pub fn parse(header: &str, body: Vec<String>, first_line: usize) -> Result<Self> {
        let (name, params) = parse_signature(header)?;
        let blocks = BlockMap::build(&body, first_line)?;
        Ok(MethodDefinition {
            name,
            params,
            body,
            first_line,
            blocks,
        })
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `name(a, b)`, `name a b` or `name`
fn parse_signature(header: &str) -> Result<(String, Vec<String>)> {
    let shape = "expected 'method name(param, ...)'";
    let (name, rest) = split_keyword(header);
    if name.is_empty() || !is_identifier(name) {
        return Err(BooseError::argument(format!("missing method name, {shape}")));
    }

    let params_text = if let Some(inner) = rest.strip_prefix('(') {
        inner
            .strip_suffix(')')
            .ok_or_else(|| BooseError::argument(format!("missing ')' in method signature, {shape}")))?
    } else {
        rest
    };

    let params: Vec<String> = params_text
        .split([',', ' ', '\t'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    for (i, param) in params.iter().enumerate() {
        if !is_identifier(param) {
            return Err(BooseError::argument(format!("invalid parameter name '{param}', {shape}")));
        }
        if params[..i].contains(param) {
            return Err(BooseError::argument(format!("duplicate parameter '{param}'")));
        }
    }

    Ok((name.to_string(), params))
}

/// Method name (case-insensitive) -> definition
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    methods: HashMap<String, Rc<MethodDefinition>>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method, replacing any previous one with the same name.
    /// Returns true when a definition was replaced.
    pub fn define(&mut self, method: MethodDefinition) -> bool {
        self.methods
            .insert(method.name.to_ascii_lowercase(), Rc::new(method))
            .is_some()
    }

    pub fn get(&self, name: &str) -> Option<Rc<MethodDefinition>> {
        self.methods.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Definitions sorted by name
    pub fn iter_sorted(&self) -> Vec<&MethodDefinition> {
        let mut methods: Vec<_> = self.methods.values().map(|m| m.as_ref()).collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        methods
    }

    pub fn clear(&mut self) {
        self.methods.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signature_forms() {
        assert_eq!(
            parse_signature("draw(p, q)").unwrap(),
            ("draw".to_string(), vec!["p".to_string(), "q".to_string()])
        );
        assert_eq!(
            parse_signature("draw (p,q)").unwrap(),
            ("draw".to_string(), vec!["p".to_string(), "q".to_string()])
        );
        assert_eq!(parse_signature("square side").unwrap().1, vec!["side".to_string()]);
        assert!(parse_signature("noargs()").unwrap().1.is_empty());
        assert!(parse_signature("noargs").unwrap().1.is_empty());
    }

    #[test]
    fn test_parse_signature_errors() {
        assert!(parse_signature("").is_err());
        assert!(parse_signature("(p)").is_err());
        assert!(parse_signature("draw(p").is_err());
        assert!(parse_signature("draw(1x)").is_err());
        assert!(parse_signature("draw(p, p)").is_err());
    }

    #[test]
    fn test_table_is_case_insensitive() {
        let mut table = MethodTable::new();
        let method = MethodDefinition::parse("Draw(p)", vec!["moveto p 1".to_string()], 2).unwrap();
        assert!(!table.define(method));
        assert!(table.contains("draw"));
        assert!(table.contains("DRAW"));
        assert_eq!(table.get("dRaW").unwrap().params, vec!["p".to_string()]);

        let again = MethodDefinition::parse("draw", Vec::new(), 9).unwrap();
        assert!(table.define(again));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_body_structure_checked_at_definition() {
        let body = vec!["if p > 1".to_string(), "moveto p p".to_string()];
        let err = MethodDefinition::parse("draw(p)", body, 5).unwrap_err();
        assert_eq!(err.line(), Some(5));
    }
}

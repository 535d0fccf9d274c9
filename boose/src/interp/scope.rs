//! Variable scope
//!
//! A scope is a flat mapping from variable name to value. There is one global
//! scope per run and one fresh local scope per method call; local scopes are
//! never chained to the caller, so a callee only sees its bound parameters.

use super::Value;
use std::collections::HashMap;

/// Variable bindings for one run or one method call
#[derive(Debug, Clone, Default)]
pub struct Scope {
    bindings: HashMap<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Scope {
            bindings: HashMap::new(),
        }
    }

    /// Define or overwrite a variable
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Mutable access, used to update arrays in place
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.bindings.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Case-insensitive lookup; only used to find a method's return variable.
    /// An exact match wins, then the smallest matching name.
    pub fn find_ignore_case(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.bindings.get(name) {
            return Some(value);
        }
        self.bindings
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings sorted by name (for listing)
    pub fn sorted(&self) -> Vec<(&str, &Value)> {
        let mut entries: Vec<_> = self
            .bindings
            .iter()
            .map(|(name, value)| (name.as_str(), value))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let mut scope = Scope::new();
        scope.define("x", Value::Int(42));
        assert_eq!(scope.get("x"), Some(&Value::Int(42)));
        assert_eq!(scope.get("y"), None);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut scope = Scope::new();
        scope.define("Count", Value::Int(1));
        assert!(scope.contains("Count"));
        assert!(!scope.contains("count"));
        assert_eq!(scope.find_ignore_case("count"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_find_ignore_case_is_deterministic() {
        let mut scope = Scope::new();
        scope.define("Fib", Value::Int(2));
        scope.define("FIB", Value::Int(3));
        assert_eq!(scope.find_ignore_case("fib"), Some(&Value::Int(3)));
        scope.define("fib", Value::Int(1));
        assert_eq!(scope.find_ignore_case("fib"), Some(&Value::Int(1)));
        assert_eq!(scope.find_ignore_case("Fib"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_redefine_overwrites() {
        let mut scope = Scope::new();
        scope.define("x", Value::Int(1));
        scope.define("x", Value::Real(2.5));
        assert_eq!(scope.get("x"), Some(&Value::Real(2.5)));
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut scope = Scope::new();
        scope.define("nums", Value::IntArray(vec![0; 3]));
        if let Some(Value::IntArray(items)) = scope.get_mut("nums") {
            items[1] = 9;
        }
        assert_eq!(scope.get("nums"), Some(&Value::IntArray(vec![0, 9, 0])));
    }

    #[test]
    fn test_sorted_and_clear() {
        let mut scope = Scope::default();
        scope.define("b", Value::Int(2));
        scope.define("a", Value::Int(1));
        let names: Vec<_> = scope.sorted().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
        scope.clear();
        assert!(scope.is_empty());
    }
}

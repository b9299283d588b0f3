//! AQL query construction. Values are always quoted and embedded quotes
//! escaped, so attribute values never leak into query syntax.

/// Quote a name or value for AQL.
pub fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\\\""))
}

/// `objectType = "<name>"`
pub fn object_type(name: &str) -> String {
    format!("objectType = {}", quote(name))
}

/// `"<attribute>" = "<value>"`
pub fn attr_equals(attribute: &str, value: &str) -> String {
    format!("{} = {}", quote(attribute), quote(value))
}

/// `"<attribute>" IS NOT EMPTY`
pub fn attr_not_empty(attribute: &str) -> String {
    format!("{} IS NOT EMPTY", quote(attribute))
}

/// Join clauses with AND.
pub fn all(clauses: &[String]) -> String {
    clauses.join(" AND ")
}

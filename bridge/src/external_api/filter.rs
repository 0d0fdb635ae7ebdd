// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The list-endpoint `filter` query parameter
//!
//! The supported grammar is exactly `<field> (eq|ne) '<value>'`.  Anything
//! that does not match is ignored and the full list is returned; clients
//! sending a malformed filter get an unfiltered 200, not an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static FILTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([a-zA-Z][a-zA-Z0-9_]*)\s+(eq|ne)\s+'([^']*)'\s*$")
        .unwrap()
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FilterOp {
    Eq,
    Ne,
}

#[derive(Clone, Debug)]
pub struct Filter {
    field: String,
    op: FilterOp,
    value: String,
}

impl Filter {
    /// Parses a filter expression; `None` means "no filtering" (including
    /// the malformed case).
    pub fn parse(expression: &str) -> Option<Filter> {
        let captures = FILTER_RE.captures(expression)?;
        let op = match &captures[2] {
            "eq" => FilterOp::Eq,
            "ne" => FilterOp::Ne,
            _ => unreachable!("anchored regex admits only eq/ne"),
        };
        Some(Filter {
            field: String::from(&captures[1]),
            op,
            value: String::from(&captures[3]),
        })
    }

    /// Whether the serialized form of an item passes the filter.  Fields
    /// that are missing or non-scalar never match `eq` (and always pass
    /// `ne`).
    fn matches(&self, item: &serde_json::Value) -> bool {
        let field_value = item.get(&self.field).and_then(|value| match value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        });
        let equal = field_value.as_deref() == Some(self.value.as_str());
        match self.op {
            FilterOp::Eq => equal,
            FilterOp::Ne => !equal,
        }
    }
}

/// Applies an optional filter expression to a list of views.
pub fn apply<T: Serialize>(items: Vec<T>, expression: Option<&str>) -> Vec<T> {
    let Some(filter) = expression.and_then(Filter::parse) else {
        return items;
    };
    items
        .into_iter()
        .filter(|item| match serde_json::to_value(item) {
            Ok(value) => filter.matches(&value),
            Err(_) => true,
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::apply;
    use super::Filter;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Item {
        name: String,
        status: String,
    }

    fn items() -> Vec<Item> {
        vec![
            Item {
                name: String::from("ip-one"),
                status: String::from("RESERVED"),
            },
            Item {
                name: String::from("ip-two"),
                status: String::from("IN_USE"),
            },
        ]
    }

    #[test]
    fn test_filter_eq_ne() {
        let filtered = apply(items(), Some("name eq 'ip-one'"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "ip-one");

        let filtered = apply(items(), Some("name ne 'ip-one'"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "ip-two");

        let filtered = apply(items(), Some("status eq 'IN_USE'"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "ip-two");
    }

    #[test]
    fn test_filter_missing_field() {
        // A field nobody has matches nothing for eq, everything for ne.
        assert_eq!(apply(items(), Some("color eq 'red'")).len(), 0);
        assert_eq!(apply(items(), Some("color ne 'red'")).len(), 2);
    }

    #[test]
    fn test_malformed_filter_is_ignored() {
        for expression in [
            "malformed garbage here",
            "name == 'ip-one'",
            "name eq ip-one",
            "name eq 'ip-one' extra",
            "",
        ] {
            assert!(
                Filter::parse(expression).is_none(),
                "parsed {:?}",
                expression
            );
            assert_eq!(apply(items(), Some(expression)).len(), 2);
        }
    }
}

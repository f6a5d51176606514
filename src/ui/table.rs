use std::collections::BTreeMap;

use tabled::{settings::Style, Table, Tabled};

use crate::model::{Claim, ClaimDialect, ClaimId, ClaimProperties};

#[derive(Tabled)]
struct DialectRow<'a> {
    #[tabled(rename = "Dialect URI")]
    dialect_uri: &'a str,
}

#[derive(Tabled)]
struct ClaimRow<'a> {
    #[tabled(rename = "ID")]
    id: ClaimId,
    #[tabled(rename = "Claim URI")]
    claim_uri: &'a str,
}

#[derive(Tabled)]
struct PropertyRow<'a> {
    #[tabled(rename = "Property")]
    name: &'a str,
    #[tabled(rename = "Value")]
    value: &'a str,
}

fn render<T: Tabled>(rows: Vec<T>) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn dialects_table(dialects: &[ClaimDialect]) -> String {
    render(
        dialects
            .iter()
            .map(|d| DialectRow { dialect_uri: &d.dialect_uri })
            .collect(),
    )
}

pub fn claims_table(claims: &BTreeMap<ClaimId, Claim>) -> String {
    render(
        claims
            .iter()
            .map(|(id, c)| ClaimRow { id: *id, claim_uri: &c.claim_uri })
            .collect(),
    )
}

/// Properties sorted by name
pub fn properties_table(properties: &ClaimProperties) -> String {
    let mut rows: Vec<PropertyRow> = properties
        .iter()
        .map(|(name, value)| PropertyRow { name, value })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(b.name));
    render(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tables_render_nothing() {
        assert!(dialects_table(&[]).is_empty());
        assert!(properties_table(&ClaimProperties::new()).is_empty());
    }

    #[test]
    fn test_properties_table_sorted() {
        let mut props = ClaimProperties::new();
        props.insert("Required".into(), "true".into());
        props.insert("Description".into(), "Test".into());

        let table = properties_table(&props);
        let description = table.find("Description").unwrap();
        let required = table.find("Required").unwrap();
        assert!(description < required);
    }

    #[test]
    fn test_claims_table_lists_ids() {
        let mut claims = BTreeMap::new();
        claims.insert(7, Claim::new("urn:test", "urn:test#attr1"));

        let table = claims_table(&claims);
        assert!(table.contains("urn:test#attr1"));
        assert!(table.contains('7'));
    }
}

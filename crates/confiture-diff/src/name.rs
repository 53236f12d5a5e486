//! Postgres identifier quoting and default constraint/index naming
//! conventions, grounded on the teacher's naming-convention helpers.

/// Postgres's own limit on identifier length; names longer than this are
/// truncated and disambiguated with a short hash suffix.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Double-quotes an identifier unless it is already a valid lowercase,
/// non-reserved-looking simple identifier, mirroring how `normalize`
/// decides whether a name needs quoting.
pub fn quote_ident(ident: &str) -> String {
    let simple = !ident.is_empty()
        && ident
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && ident
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if simple {
        ident.to_string()
    } else {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

pub fn qualify(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

fn truncated(candidate: String) -> String {
    if candidate.len() <= MAX_IDENTIFIER_LEN {
        return candidate;
    }
    let digest = {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(candidate.as_bytes());
        hex::encode(&hasher.finalize()[..4])
    };
    let keep = MAX_IDENTIFIER_LEN - digest.len() - 1;
    format!("{}_{}", &candidate[..keep], digest)
}

/// Default name for a single/multi-column constraint: `{table}_{cols}_{suffix}`.
pub fn default_constraint_name(table: &str, columns: &[String], suffix: &str) -> String {
    truncated(format!("{}_{}_{}", table, columns.join("_"), suffix))
}

/// Default name for an index: `{table}_{cols}_idx`.
pub fn default_index_name(table: &str, columns: &[String]) -> String {
    truncated(format!("{}_{}_idx", table, columns.join("_")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_idents_are_unquoted() {
        assert_eq!(quote_ident("users"), "users");
    }

    #[test]
    fn mixed_case_is_quoted() {
        assert_eq!(quote_ident("Users"), "\"Users\"");
    }

    #[test]
    fn long_names_are_truncated_with_hash() {
        let cols: Vec<String> = (0..20).map(|i| format!("column_number_{i}")).collect();
        let name = default_index_name("a_very_long_table_name_indeed", &cols);
        assert!(name.len() <= MAX_IDENTIFIER_LEN);
    }
}

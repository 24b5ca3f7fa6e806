//! Lexical helpers over Cypher statement text
//!
//! None of this parses Cypher. It tracks string literals and bracket nesting
//! well enough to find clause keywords, split a RETURN projection and blank
//! out property maps without being fooled by their contents.

/// Clauses that modify the graph
const WRITE_CLAUSES: [&str; 8] = [
    "CREATE", "MERGE", "SET", "DELETE", "DETACH", "REMOVE", "DROP", "FOREACH",
];

/// Per byte: true when the byte is code (outside any string literal) and,
/// with `top_level_only`, also outside every `()`, `[]` and `{}`.
fn code_mask(query: &str, top_level_only: bool) -> Vec<bool> {
    let mut mask = Vec::with_capacity(query.len());
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for &b in query.as_bytes() {
        if let Some(q) = quote {
            mask.push(false);
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' | b'`' => {
                quote = Some(b);
                mask.push(false);
            }
            b'(' | b'[' | b'{' => {
                mask.push(!top_level_only);
                depth += 1;
            }
            b')' | b']' | b'}' => {
                depth = depth.saturating_sub(1);
                mask.push(!top_level_only);
            }
            _ => mask.push(!top_level_only || depth == 0),
        }
    }
    mask
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Byte offsets of `keyword` as a whole word, case-insensitive, where the
/// mask allows it. Property access (`n.set`) and parameters (`$limit`) are
/// not keywords.
fn keyword_positions(query: &str, mask: &[bool], keyword: &str) -> Vec<usize> {
    let upper = query.to_ascii_uppercase();
    let bytes = upper.as_bytes();
    let mut positions = Vec::new();
    let mut from = 0;
    while let Some(offset) = upper[from..].find(keyword) {
        let pos = from + offset;
        let end = pos + keyword.len();
        let before_ok = pos == 0 || {
            let prev = bytes[pos - 1];
            !is_word_byte(prev) && prev != b'.' && prev != b'$'
        };
        let after_ok = end >= bytes.len() || !is_word_byte(bytes[end]);
        if before_ok && after_ok && mask[pos] {
            positions.push(pos);
        }
        from = pos + 1;
    }
    positions
}

/// The first write clause in the statement, if any
pub fn write_clause(query: &str) -> Option<&'static str> {
    let mask = code_mask(query, false);
    WRITE_CLAUSES
        .iter()
        .filter_map(|kw| keyword_positions(query, &mask, kw).first().map(|&p| (p, *kw)))
        .min_by_key(|(p, _)| *p)
        .map(|(_, kw)| kw)
}

/// Column names of the final RETURN clause, in projection order.
///
/// An aliased item is named by its alias; any other item by its expression
/// text, which is how Neo4j names the column. `*` contributes nothing.
pub fn return_columns(query: &str) -> Vec<String> {
    let mask = code_mask(query, true);
    let Some(start) = keyword_positions(query, &mask, "RETURN")
        .last()
        .map(|p| p + "RETURN".len())
    else {
        return Vec::new();
    };

    let mut end = query.len();
    for kw in ["ORDER", "SKIP", "LIMIT"] {
        if let Some(p) = keyword_positions(query, &mask, kw)
            .into_iter()
            .find(|&p| p > start)
        {
            end = end.min(p);
        }
    }
    if let Some(p) = (start..end).find(|&i| mask[i] && query.as_bytes()[i] == b';') {
        end = p;
    }

    let aliases = keyword_positions(query, &mask, "AS");
    let mut items = Vec::new();
    let mut item_start = start;
    for i in start..=end {
        if i == end || (mask[i] && query.as_bytes()[i] == b',') {
            items.push((item_start, i));
            item_start = i + 1;
        }
    }

    let mut columns = Vec::with_capacity(items.len());
    for (n, (s, e)) in items.into_iter().enumerate() {
        let name = match aliases.iter().rev().find(|&&p| p >= s && p < e) {
            Some(&p) => query[p + 2..e].trim().trim_matches('`').to_string(),
            None => {
                let text = query[s..e].trim();
                if n == 0 {
                    strip_distinct(text).to_string()
                } else {
                    text.to_string()
                }
            }
        };
        if !name.is_empty() && name != "*" {
            columns.push(name);
        }
    }
    columns
}

fn strip_distinct(item: &str) -> &str {
    match (item.get(..8), item.as_bytes().get(8)) {
        (Some(head), Some(b)) if head.eq_ignore_ascii_case("DISTINCT") && b.is_ascii_whitespace() => {
            item[8..].trim()
        }
        _ => item,
    }
}

/// Replace the contents of every `{...}` property map with spaces.
///
/// Byte offsets are unchanged, so positions found in the result index the
/// original text. Braces inside string literals are not maps.
pub fn blank_property_maps(query: &str) -> String {
    let mut out = Vec::with_capacity(query.len());
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for &b in query.as_bytes() {
        let inside = depth > 0;
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
        } else {
            match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b'{' => {
                    depth += 1;
                    if depth == 1 {
                        out.push(b);
                        continue;
                    }
                }
                b'}' if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        out.push(b);
                        continue;
                    }
                }
                _ => {}
            }
        }
        out.push(if inside { b' ' } else { b });
    }
    // every non-ASCII byte sits either outside a map (copied whole) or
    // inside one (blanked), so the result is valid UTF-8
    String::from_utf8(out).unwrap_or_else(|_| query.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_columns_aliases_and_expressions() {
        assert_eq!(
            return_columns("MATCH (c:Customer)-[:HAS_ACCOUNT]->(a) RETURN c.first_name, a.balance AS balance, count(a) AS n"),
            vec!["c.first_name", "balance", "n"]
        );
    }

    #[test]
    fn test_return_columns_stops_at_order_skip_limit() {
        assert_eq!(
            return_columns("MATCH (a:Account) RETURN DISTINCT a.type AS type, a.balance ORDER BY a.balance DESC LIMIT 5"),
            vec!["type", "a.balance"]
        );
    }

    #[test]
    fn test_return_columns_ignores_nested_commas_and_subqueries() {
        let query = "MATCH (c:Customer) CALL { WITH c MATCH (c)-[:HAS_ACCOUNT]->(a) RETURN a } \
                     RETURN coalesce(c.email, 'n/a') AS email, [x IN [1, 2] | x] AS xs, {a: 1, b: 2} AS m";
        assert_eq!(return_columns(query), vec!["email", "xs", "m"]);
    }

    #[test]
    fn test_return_columns_backtick_alias_and_star() {
        assert_eq!(return_columns("MATCH (n) RETURN n.x AS `total balance`"), vec!["total balance"]);
        assert!(return_columns("MATCH (n) RETURN *").is_empty());
        assert!(return_columns("CALL db.labels()").is_empty());
    }

    #[test]
    fn test_write_clause_detection() {
        assert_eq!(write_clause("MATCH (c:Customer) DETACH DELETE c"), Some("DETACH"));
        assert_eq!(write_clause("MERGE (b:Branch {name: 'X'})"), Some("MERGE"));
        assert_eq!(write_clause("MATCH (c) CALL { WITH c SET c.flag = true } RETURN c"), Some("SET"));
        assert_eq!(write_clause("match (a:Account) set a.balance = 0"), Some("SET"));
    }

    #[test]
    fn test_read_statements_have_no_write_clause() {
        assert_eq!(
            write_clause("MATCH (a:Account) WHERE a.status = 'DELETE' RETURN a.set, $create"),
            None
        );
        assert_eq!(write_clause("MATCH (c:Customer) RETURN c.created_at"), None);
    }

    #[test]
    fn test_blank_property_maps_keeps_offsets() {
        let query = "MATCH (c:Customer {id: toInteger('123'), tags: {a: 1}})-[:HAS_ACCOUNT]->(a)";
        let blanked = blank_property_maps(query);
        assert_eq!(blanked.len(), query.len());
        assert!(blanked.starts_with("MATCH (c:Customer {"));
        assert!(!blanked.contains("toInteger"));
        assert!(blanked.ends_with("})-[:HAS_ACCOUNT]->(a)"));
        assert_eq!(
            blank_property_maps("WHERE c.name = '{x}' RETURN c"),
            "WHERE c.name = '{x}' RETURN c"
        );
    }
}

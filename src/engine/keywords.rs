/// Keyword tables shared by layout, standardization and obfuscation.

/// Reserved words: re-cased by layout, case-scrambled by obfuscation.
const KEYWORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "ANY", "APPLY", "AS", "ASC", "BEGIN", "BETWEEN", "BREAK", "BY",
    "CASE", "CAST", "CATCH", "CHECK", "CLOSE", "COLUMN", "COMMIT", "CONSTRAINT", "CONTINUE",
    "CONVERT", "CREATE", "CROSS", "CURSOR", "DEALLOCATE", "DECLARE", "DEFAULT", "DELETE", "DESC",
    "DISTINCT", "DISTRIBUTED", "DROP", "ELSE", "END", "EXCEPT", "EXEC", "EXECUTE", "EXISTS",
    "FETCH", "FOR", "FOREIGN", "FROM", "FULL", "FUNCTION", "GO", "GOTO", "GRANT", "GROUP",
    "HAVING", "IF", "IN", "INDEX", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "KEY",
    "LEFT", "LIKE", "MERGE", "NOT", "NULL", "OF", "OFF", "ON", "OPEN", "OPTION", "OR", "ORDER",
    "OUTER", "OUTPUT", "OVER", "PARTITION", "PRIMARY", "PRINT", "PROC", "PROCEDURE", "RAISERROR",
    "RETURN", "REVOKE", "RIGHT", "ROLLBACK", "SAVE", "SELECT", "SET", "TABLE", "THEN", "THROW",
    "TOP", "TRAN", "TRANSACTION", "TRUNCATE", "TRY", "UNION", "UNIQUE", "UPDATE", "USE", "VALUES",
    "VIEW", "WHEN", "WHERE", "WHILE", "WITH",
];

/// Words that open a new statement wherever a statement may begin.
const STATEMENT_STARTERS: &[&str] = &[
    "ALTER", "BEGIN", "BREAK", "CLOSE", "COMMIT", "CONTINUE", "CREATE", "DEALLOCATE", "DECLARE",
    "DELETE", "DROP", "ELSE", "END", "EXEC", "EXECUTE", "FETCH", "GO", "GOTO", "GRANT", "IF",
    "INSERT", "MERGE", "OPEN", "PRINT", "RAISERROR", "RETURN", "REVOKE", "ROLLBACK", "SAVE",
    "SELECT", "SET", "THROW", "TRUNCATE", "UPDATE", "USE", "WHILE",
];

/// Short form → full form. Obfuscation substitution applies the reverse.
const SYNONYMS: &[(&str, &str)] = &[
    ("PROC", "PROCEDURE"),
    ("TRAN", "TRANSACTION"),
    ("EXEC", "EXECUTE"),
];

#[must_use]
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Whether `word` can open a statement.
#[must_use]
pub fn is_statement_starter(word: &str) -> bool {
    STATEMENT_STARTERS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Full form for a short keyword (`PROC` → `PROCEDURE`), in upper case.
#[must_use]
pub fn standard_form(word: &str) -> Option<&'static str> {
    SYNONYMS
        .iter()
        .find(|(short, _)| short.eq_ignore_ascii_case(word))
        .map(|(_, full)| *full)
}

/// Short form for a full keyword (`PROCEDURE` → `PROC`), in upper case.
#[must_use]
pub fn alternate_form(word: &str) -> Option<&'static str> {
    SYNONYMS
        .iter()
        .find(|(_, full)| full.eq_ignore_ascii_case(word))
        .map(|(short, _)| *short)
}

/// Render `replacement` in lower case when `original` was written in lower case.
#[must_use]
pub fn match_case(original: &str, replacement: &str) -> String {
    if original.chars().any(char::is_uppercase) {
        replacement.to_owned()
    } else {
        replacement.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup_ignores_case() {
        assert!(is_keyword("select"));
        assert!(is_keyword("SeLeCt"));
        assert!(!is_keyword("customers"));
    }

    #[test]
    fn test_statement_starters_are_keywords() {
        assert!(is_statement_starter("if"));
        assert!(!is_statement_starter("exists"));
        for word in STATEMENT_STARTERS {
            assert!(is_keyword(word), "{word} is not in the keyword table");
        }
    }

    #[test]
    fn test_synonyms_round_trip() {
        assert_eq!(standard_form("proc"), Some("PROCEDURE"));
        assert_eq!(alternate_form("Procedure"), Some("PROC"));
        assert_eq!(standard_form("PROCEDURE"), None);
        assert_eq!(alternate_form("select"), None);
    }

    #[test]
    fn test_match_case() {
        assert_eq!(match_case("proc", "PROCEDURE"), "procedure");
        assert_eq!(match_case("Proc", "PROCEDURE"), "PROCEDURE");
    }
}

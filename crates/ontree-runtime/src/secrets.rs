//! Heuristic classification of secret-looking environment variables.
//!
//! This is not a secrets manager. It only decides which variables of a
//! migrated container get copied into the `.env` sidecar.

/// Substrings (uppercase) that mark a variable name as secret-like.
pub const SECRET_MARKERS: &[&str] = &["KEY", "SECRET", "PASSWORD", "TOKEN"];

/// Variables the runtime injects that never belong in a bundle.
pub const SYSTEM_VARIABLES: &[&str] = &["PATH", "HOME", "HOSTNAME"];

/// Splits a `KEY=VALUE` entry. An entry without `=` is all key.
#[must_use]
pub fn split_entry(entry: &str) -> (&str, Option<&str>) {
    match entry.split_once('=') {
        Some((key, value)) => (key, Some(value)),
        None => (entry, None),
    }
}

/// Whether a variable name looks like it holds a secret.
#[must_use]
pub fn is_secret_name(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    SECRET_MARKERS.iter().any(|marker| upper.contains(marker))
}

/// Whether a variable is injected by the runtime itself.
#[must_use]
pub fn is_system_variable(name: &str) -> bool {
    SYSTEM_VARIABLES.contains(&name)
}

/// Entries with a value whose name looks secret-like, in input order.
pub fn secret_entries<'a, I>(env: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    env.into_iter()
        .map(String::as_str)
        .filter(|entry| {
            let (key, value) = split_entry(entry);
            value.is_some() && !is_system_variable(key) && is_secret_name(key)
        })
        .collect()
}

/// Renders sidecar contents: one `KEY=VALUE` per line.
#[must_use]
pub fn render_sidecar(entries: &[&str]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(entry);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_names_match_case_insensitively() {
        assert!(is_secret_name("API_KEY"));
        assert!(is_secret_name("db_password"));
        assert!(is_secret_name("GithubToken"));
        assert!(is_secret_name("JWT_SECRET"));
        assert!(is_secret_name("MONKEY"));
        assert!(!is_secret_name("DATABASE_URL"));
    }

    #[test]
    fn secret_entries_keep_order_and_skip_valueless() {
        let env: Vec<String> = ["PATH=/bin", "API_KEY=abc", "LOG=debug", "TOKEN", "DB_PASSWORD=x=y"]
            .iter()
            .map(|s| (*s).to_owned())
            .collect();
        assert_eq!(secret_entries(&env), vec!["API_KEY=abc", "DB_PASSWORD=x=y"]);
    }

    #[test]
    fn split_entry_keeps_equals_in_value() {
        assert_eq!(split_entry("A=b=c"), ("A", Some("b=c")));
        assert_eq!(split_entry("FLAG"), ("FLAG", None));
    }

    #[test]
    fn sidecar_has_one_line_per_entry() {
        assert_eq!(render_sidecar(&["A_KEY=1", "B_TOKEN=2"]), "A_KEY=1\nB_TOKEN=2\n");
        assert_eq!(render_sidecar(&[]), "");
    }
}

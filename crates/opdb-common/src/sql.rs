//! SQL identifier helpers
//!
//! Table and column names come from the static dataset catalog and from TSV
//! header lines, so they are always quoted before being spliced into DDL or
//! `COPY` statements. Several webservice columns (`references`, `type`) are
//! reserved words.

/// Quote a single identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    let mut quoted = String::with_capacity(ident.len() + 2);
    quoted.push('"');
    for ch in ident.chars() {
        if ch == '"' {
            quoted.push('"');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// Quote and comma-join a list of identifiers.
pub fn quote_list<I, S>(idents: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    idents
        .into_iter()
        .map(|ident| quote_ident(ident.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

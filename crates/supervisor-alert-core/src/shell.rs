//! Shell-style command line handling.
//!
//! User-supplied alert commands arrive as one string (`-c "mail -s alert ops"`)
//! and are split into an argv once at startup. Nothing here runs a shell: the
//! split argv is executed directly, so the alert message is never
//! re-interpreted by `sh`.

/// Split a command line with POSIX shell quoting rules.
pub fn split_command_line(line: &str) -> Result<Vec<String>, String> {
    let argv = shlex::split(line).ok_or_else(|| format!("Unbalanced quoting in: {}", line))?;
    if argv.is_empty() {
        return Err("Empty command".to_string());
    }
    Ok(argv)
}

/// Render a program and its arguments as a copy-pasteable command line.
///
/// Used for log messages only. Arguments that can't be quoted (NUL bytes) are
/// shown in debug form instead.
pub fn quote_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(|part| match shlex::try_quote(part) {
            Ok(quoted) => quoted.into_owned(),
            Err(_) => format!("{:?}", part),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

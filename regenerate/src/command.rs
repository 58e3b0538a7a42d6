use crate::manifest::Str;

/// Turns a decoded secret value into a shell command whose standard output is that value.
pub trait CommandEncoder {
    fn encode(&self, value: &str) -> Str;
}

impl<F> CommandEncoder for F
where
    F: Fn(&str) -> Str,
{
    fn encode(&self, value: &str) -> Str {
        self(value)
    }
}

/// `printf "<value>"`, the form the secret generator stage expects.
///
/// Only double quotes are escaped. Backslashes, `%`, `$`, backticks and a leading `-` reach the
/// shell untouched, so values containing them will not be reproduced faithfully.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintfCommand;

impl CommandEncoder for PrintfCommand {
    fn encode(&self, value: &str) -> Str {
        let mut command = Str::with_capacity(value.len() + "printf \"\"".len());
        command.push_str("printf \"");
        for c in value.chars() {
            if c == '"' {
                command.push('\\');
            }
            command.push(c);
        }
        command.push('"');
        command
    }
}

/// What a POSIX shell prints for a command produced by [`PrintfCommand`], for values that avoid
/// the unescaped metacharacters.
#[cfg(test)]
pub(crate) fn simulate_printf(command: &str) -> Option<String> {
    let quoted = command.strip_prefix("printf \"")?.strip_suffix('"')?;
    Some(quoted.replace("\\\"", "\""))
}

//! Interactive prompting with a validation loop.
//!
//! One contract for every prompt in the tool: the absence of a default
//! implies the value is required (empty input re-prompts with a notice), a
//! present default is substituted for empty input, and the validation
//! callback also runs over defaulted values. Reader and writer are
//! injectable so tests drive the loop without a terminal.

use std::io::{BufRead, Write};

use anyhow::{Context, bail};

/// Options for [`prompt`].
pub struct PromptOptions<'a> {
    /// Value substituted when the input line is empty.
    pub default: Option<&'a str>,
    /// Transform/validation callback; an `Err` message is printed and the
    /// prompt repeats.
    pub callback: Option<&'a dyn Fn(&str) -> Result<String, String>>,
    /// Strip leading/trailing whitespace from the input.
    pub trim_spaces: bool,
    /// Append ` [default]` to the displayed message.
    pub show_default: bool,
}

impl Default for PromptOptions<'_> {
    fn default() -> Self {
        Self {
            default: None,
            callback: None,
            trim_spaces: true,
            show_default: true,
        }
    }
}

/// Read one validated line from `input`, echoing prompts to `output`.
///
/// Loops until a value passes. EOF on the input stream is an error rather
/// than a retry, so non-interactive misuse terminates instead of spinning.
pub fn prompt_from<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    msg: &str,
    options: &PromptOptions<'_>,
) -> anyhow::Result<String> {
    let mut displayed = msg.to_string();
    if options.show_default
        && let Some(default) = options.default
    {
        displayed.push_str(&format!(" [{default}]"));
    }

    loop {
        write!(output, "{displayed}: ").context("write prompt")?;
        output.flush().context("flush prompt")?;

        let mut line = String::new();
        let read = input.read_line(&mut line).context("read prompt input")?;
        if read == 0 {
            bail!("input stream closed while prompting for '{msg}'");
        }

        let mut value = line.trim_end_matches(['\r', '\n']).to_string();
        if options.trim_spaces {
            value = value.trim().to_string();
        }

        let value = if value.is_empty() {
            match options.default {
                Some(default) => default.to_string(),
                None => {
                    writeln!(output, "Value required").context("write notice")?;
                    continue;
                }
            }
        } else {
            value
        };

        match options.callback {
            None => return Ok(value),
            Some(callback) => match callback(&value) {
                Ok(value) => return Ok(value),
                Err(message) => {
                    writeln!(output, "{message}").context("write notice")?;
                }
            },
        }
    }
}

/// Prompt on stdin/stdout.
pub fn prompt(msg: &str, options: &PromptOptions<'_>) -> anyhow::Result<String> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    prompt_from(stdin.lock(), stdout.lock(), msg, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(input: &str, msg: &str, options: &PromptOptions<'_>) -> (anyhow::Result<String>, String) {
        let mut output = Vec::new();
        let result = prompt_from(Cursor::new(input), &mut output, msg, options);
        (result, String::from_utf8(output).expect("utf8 output"))
    }

    #[test]
    fn returns_trimmed_input() {
        let (result, output) = run("  staging  \n", "Environment", &PromptOptions::default());
        assert_eq!(result.expect("value"), "staging");
        assert_eq!(output, "Environment: ");
    }

    #[test]
    fn keeps_spaces_when_trimming_is_disabled() {
        let options = PromptOptions {
            trim_spaces: false,
            ..PromptOptions::default()
        };
        let (result, _) = run("  padded  \n", "Value", &options);
        assert_eq!(result.expect("value"), "  padded  ");
    }

    #[test]
    fn empty_input_takes_the_default() {
        let options = PromptOptions {
            default: Some("main"),
            ..PromptOptions::default()
        };
        let (result, output) = run("\n", "Branch", &options);
        assert_eq!(result.expect("value"), "main");
        assert_eq!(output, "Branch [main]: ");
    }

    #[test]
    fn default_is_hidden_when_show_default_is_off() {
        let options = PromptOptions {
            default: Some("main"),
            show_default: false,
            ..PromptOptions::default()
        };
        let (_, output) = run("\n", "Branch", &options);
        assert_eq!(output, "Branch: ");
    }

    #[test]
    fn empty_input_without_default_reprompts() {
        let (result, output) = run("\n\nvalue\n", "Name", &PromptOptions::default());
        assert_eq!(result.expect("value"), "value");
        assert_eq!(output.matches("Value required").count(), 2);
        assert_eq!(output.matches("Name: ").count(), 3);
    }

    #[test]
    fn callback_failure_reprompts_with_its_message() {
        let validate = |value: &str| -> Result<String, String> {
            value
                .parse::<u16>()
                .map(|port| port.to_string())
                .map_err(|_| "port must be a number".to_string())
        };
        let options = PromptOptions {
            callback: Some(&validate),
            ..PromptOptions::default()
        };
        let (result, output) = run("not-a-port\n8080\n", "Port", &options);
        assert_eq!(result.expect("value"), "8080");
        assert!(output.contains("port must be a number"));
    }

    #[test]
    fn callback_also_validates_the_default() {
        let validate = |value: &str| -> Result<String, String> {
            if value == "bad" {
                Err("try again".to_string())
            } else {
                Ok(value.to_string())
            }
        };
        let options = PromptOptions {
            default: Some("bad"),
            callback: Some(&validate),
            ..PromptOptions::default()
        };
        let (result, output) = run("\ngood\n", "Value", &options);
        assert_eq!(result.expect("value"), "good");
        assert!(output.contains("try again"));
    }

    #[test]
    fn eof_is_an_error() {
        let (result, _) = run("", "Name", &PromptOptions::default());
        let err = result.expect_err("eof");
        assert!(err.to_string().contains("input stream closed"));
    }
}

use thiserror::Error;

/// A flag that the builtin does not accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid option (-{0})")]
pub struct InvalidOption(pub char);

/// Arguments of a builtin, split into flags and operands.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractedArgs {
    /// Flags in the order they were first seen, without duplicates.
    pub options: Vec<char>,
    /// Everything that is not a flag cluster, in order.
    pub operands: Vec<String>,
}

impl ExtractedArgs {
    pub fn has(&self, option: char) -> bool {
        self.options.contains(&option)
    }
}

/// Partition `raw` into flags and operands.
///
/// An argument of the form `-xyz` contributes the flags `x`, `y` and `z`, each
/// of which must appear in `accepted`. A lone `-` is an operand. Extraction
/// stops at the first rejected flag.
pub fn extract<S: AsRef<str>>(accepted: &str, raw: &[S]) -> Result<ExtractedArgs, InvalidOption> {
    let mut extracted = ExtractedArgs::default();
    for arg in raw.iter().map(AsRef::as_ref) {
        match arg.strip_prefix('-') {
            Some(flags) if !flags.is_empty() => {
                for flag in flags.chars() {
                    if !accepted.contains(flag) {
                        return Err(InvalidOption(flag));
                    }
                    if !extracted.options.contains(&flag) {
                        extracted.options.push(flag);
                    }
                }
            }
            _ => extracted.operands.push(arg.to_owned()),
        }
    }
    Ok(extracted)
}

//! Post-processing of raw model replies.

/// Turns a raw reply from a text generator into the value handed back to the caller.
pub trait ParseOutput: Send + Sync {
    type Output;
    fn parse(&self, raw: String) -> Self::Output;
}

/// Passes the reply through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrOutputParser;

impl ParseOutput for StrOutputParser {
    type Output = String;

    #[inline]
    fn parse(&self, raw: String) -> String {
        raw
    }
}

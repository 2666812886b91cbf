//! Brazilian postal code (CEP) validation.

use std::fmt;

use crate::error::PipelineError;

pub const CEP_LEN: usize = 8;

/// True iff `candidate` is exactly eight ASCII decimal digits.
pub fn is_valid_cep(candidate: &str) -> bool {
    candidate.len() == CEP_LEN && candidate.bytes().all(|b| b.is_ascii_digit())
}

/// A postal code that passed [`is_valid_cep`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cep(String);

impl Cep {
    pub fn parse(candidate: &str) -> Result<Self, PipelineError> {
        if is_valid_cep(candidate) {
            Ok(Self(candidate.to_owned()))
        } else {
            Err(PipelineError::InvalidInput {
                detail: Some(format!("expected {CEP_LEN} digits, got {candidate:?}")),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Cep {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

//! Password protection via the `qpdf` command-line tool.
//!
//! 128-bit encryption with the same user and owner password, matching what
//! the bot advertises. lopdf can read encrypted files but not write them, so
//! this capability shells out.

use std::path::Path;

use tokio::process::Command;

use crate::pdf::PdfError;

pub const MIN_PASSWORD_LEN: usize = 4;

/// Gate applied before the terminal encrypt action; shorter passwords
/// re-prompt without advancing the workflow.
pub fn password_acceptable(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

pub async fn encrypt_pdf(input: &Path, password: &str, out: &Path) -> Result<(), PdfError> {
    let output = Command::new("qpdf")
        .arg("--encrypt")
        .arg(password)
        .arg(password)
        .arg("128")
        .arg("--")
        .arg(input)
        .arg(out)
        .output()
        .await
        .map_err(|e| PdfError::Tool(format!("failed to run qpdf: {e}")))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(PdfError::Tool(format!(
            "qpdf exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_passwords_are_rejected() {
        assert!(!password_acceptable(""));
        assert!(!password_acceptable("a"));
        assert!(!password_acceptable("abc"));
    }

    #[test]
    fn four_or_more_characters_pass() {
        assert!(password_acceptable("abcd"));
        assert!(password_acceptable("correct horse battery staple"));
        // Counted in characters, not bytes.
        assert!(password_acceptable("пароль"));
    }
}

//! Email address normalization.

use mailparse::{addrparse, MailAddr};

use super::OtpError;

/// Trim and lower-case an address, rejecting anything that is not a single
/// plain mailbox with a dotted domain.
pub fn normalize_email(raw: &str) -> Result<String, OtpError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(OtpError::InvalidInput("Email is required".to_string()));
    }

    let invalid = || OtpError::InvalidInput(format!("Invalid email address: {}", raw.trim()));

    let list = addrparse(&email).map_err(|_| invalid())?;
    let addr = match list.as_slice() {
        [MailAddr::Single(info)] if info.display_name.is_none() => info.addr.as_str(),
        _ => return Err(invalid()),
    };
    if addr != email {
        return Err(invalid());
    }

    match email.rsplit_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.') =>
        {
            Ok(email)
        }
        _ => Err(invalid()),
    }
}

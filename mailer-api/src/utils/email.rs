use crate::error::{MailerError, Result};

/// Bare address of a mailbox, accepting both `user@host` and `Name <user@host>`
pub fn address_part(mailbox: &str) -> &str {
    let trimmed = mailbox.trim();
    match (trimmed.rfind('<'), trimmed.ends_with('>')) {
        (Some(start), true) => trimmed[start + 1..trimmed.len() - 1].trim(),
        _ => trimmed,
    }
}

/// Basic email validation
pub fn validate_email(email: &str) -> Result<()> {
    let email = address_part(email);

    if email.is_empty() {
        return Err(MailerError::Validation("Email is empty".to_string()));
    }

    if email.chars().any(char::is_whitespace) {
        return Err(MailerError::Validation(format!(
            "Invalid email address: {}",
            email
        )));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(MailerError::Validation(format!(
            "Invalid email address: {}",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(MailerError::Validation(format!(
            "Invalid email address: {}",
            email
        )));
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(MailerError::Validation(format!(
            "Invalid email domain: {}",
            email
        )));
    }

    Ok(())
}

/// Domain of an address, used to qualify generated message ids
pub fn domain_of(mailbox: &str) -> Option<&str> {
    address_part(mailbox)
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .filter(|domain| !domain.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(validate_email("test@example.com").is_ok());
        assert!(validate_email("user.name@example.co.uk").is_ok());
        assert!(validate_email("Support Team <support@example.com>").is_ok());
    }

    #[test]
    fn test_invalid_email() {
        assert!(validate_email("").is_err());
        assert!(validate_email("test").is_err());
        assert!(validate_email("test@").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("test@domain").is_err());
        assert!(validate_email("a b@example.com").is_err());
        assert!(validate_email("a@b@example.com").is_err());
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("Ops <ops@mail.example.com>"), Some("mail.example.com"));
        assert_eq!(domain_of("nobody"), None);
    }
}

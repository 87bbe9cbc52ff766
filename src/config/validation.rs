use crate::config::types::{Config, CrawlRequest, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_user_agent_config(&config.user_agent)?;
    validate_request(&config.crawl)?;
    Ok(())
}

/// Validates the parts of a crawl request that cannot be degraded gracefully
///
/// Malformed seeds, overlong or invalid URL filters and bad headers are not
/// errors here: the crawl drops them individually and carries on.
pub fn validate_request(request: &CrawlRequest) -> Result<(), ConfigError> {
    if request.urls.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    if request.max_urls < 1 {
        return Err(ConfigError::Validation(format!(
            "max_urls must be >= 1, got {}",
            request.max_urls
        )));
    }

    if !request.rate_limit.is_finite() || request.rate_limit <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "rate_limit must be a positive number of requests per second, got {}",
            request.rate_limit
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
        assert!(validate_email("a@b@example.com").is_err());
    }

    #[test]
    fn test_validate_request_requires_seeds() {
        let request = CrawlRequest::new(Vec::<String>::new());
        assert!(matches!(
            validate_request(&request),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_request_rate_limit() {
        let mut request = CrawlRequest::new(["https://example.com/"]);
        assert!(validate_request(&request).is_ok());

        request.rate_limit = 0.0;
        assert!(validate_request(&request).is_err());

        request.rate_limit = f64::NAN;
        assert!(validate_request(&request).is_err());

        request.rate_limit = 0.5;
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn test_validate_request_zero_budget() {
        let mut request = CrawlRequest::new(["https://example.com/"]);
        request.max_urls = 0;
        assert!(validate_request(&request).is_err());
    }

    #[test]
    fn test_malformed_seed_is_not_a_config_error() {
        let request = CrawlRequest::new(["not a url", "https://example.com/"]);
        assert!(validate_request(&request).is_ok());
    }
}

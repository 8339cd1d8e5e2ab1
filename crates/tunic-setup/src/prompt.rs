use anyhow::Result;
use dialoguer::Input;

use crate::error::SetupError;

/// Use `domain` if given, otherwise ask for it.
pub fn prompt_domain(non_interactive: bool, domain: Option<String>) -> Result<String> {
    if let Some(domain) = domain {
        return Ok(domain);
    }
    if non_interactive {
        let reason = "--domain is required in non-interactive mode".into();
        return Err(SetupError::Validation(reason).into());
    }
    let domain: String = Input::new()
        .with_prompt("Domain resolving to this host")
        .interact_text()?;
    Ok(domain)
}

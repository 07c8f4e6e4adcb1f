//! Address-or-key-name parameter resolution.

use crate::chain::Keyring;

use super::DispatchError;

/// Resolve a parameter that denotes an address.
///
/// A value that already carries the address prefix and the `1` separator is
/// used verbatim. Anything
/// else is taken as a local key name and replaced by that key's address; an
/// unknown name fails. Malformed addresses are not detected here and surface
/// as key-not-found.
pub async fn resolve_address(
    keyring: &dyn Keyring,
    prefix: &str,
    value: &str,
) -> Result<String, DispatchError> {
    if value.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('1')) {
        return Ok(value.to_string());
    }

    match keyring.address(value).await? {
        Some(address) => {
            tracing::debug!(key = value, address, "Resolved key name");
            Ok(address)
        }
        None => Err(DispatchError::KeyNotFound(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::StaticKeyring;

    #[tokio::test]
    async fn test_prefixed_value_used_verbatim() {
        let keyring = StaticKeyring::new();
        let resolved = resolve_address(&keyring, "kira", "kira1xyz").await.unwrap();
        assert_eq!(resolved, "kira1xyz");
    }

    #[tokio::test]
    async fn test_key_name_substituted() {
        let keyring = StaticKeyring::new().with_key("bob", "kira1bob");
        let resolved = resolve_address(&keyring, "kira", "bob").await.unwrap();
        assert_eq!(resolved, "kira1bob");
    }

    #[tokio::test]
    async fn test_key_name_sharing_the_prefix_is_looked_up() {
        let keyring = StaticKeyring::new().with_key("kiraops", "kira1ops");
        let resolved = resolve_address(&keyring, "kira", "kiraops").await.unwrap();
        assert_eq!(resolved, "kira1ops");

        let err = resolve_address(&keyring, "kira", "kiradev").await.unwrap_err();
        assert!(matches!(err, DispatchError::KeyNotFound(ref name) if name == "kiradev"));
    }

    #[tokio::test]
    async fn test_mistyped_address_is_key_not_found() {
        let keyring = StaticKeyring::new();
        let err = resolve_address(&keyring, "kira", "kria1typo").await.unwrap_err();
        assert!(matches!(err, DispatchError::KeyNotFound(ref name) if name == "kria1typo"));
    }
}

/// Sources module
///
/// Upstream calls the provider makes: token issuance against the identity
/// provider and the validity probe against the CRM.
pub mod oauth2;
pub mod probe;
